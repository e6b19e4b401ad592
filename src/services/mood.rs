//! Mood lookups
//!
//! Static tables describing each mood, the kinds of tasks that suit it, and
//! the moods a given weather condition tends to go with.

use crate::models::{Mood, TaskCategory};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Description of one mood
#[derive(Debug, Clone, Serialize)]
pub struct MoodInfo {
    pub mood: Mood,
    pub emoji: &'static str,
    pub description: &'static str,
}

/// Task ideas for a mood
#[derive(Debug, Clone, Serialize)]
pub struct MoodSuggestions {
    pub mood: Mood,
    /// Categories worth picking from first
    pub categories: Vec<TaskCategory>,
    pub ideas: Vec<&'static str>,
}

/// Moods and ideas for a weather condition
#[derive(Debug, Clone, Serialize)]
pub struct WeatherSuggestions {
    pub condition: &'static str,
    pub moods: Vec<Mood>,
    pub ideas: Vec<&'static str>,
}

static MOODS: Lazy<Vec<MoodInfo>> = Lazy::new(|| {
    use Mood::*;
    [
        (Happy, "😊", "Upbeat and motivated"),
        (Sad, "😢", "Low energy, be gentle with yourself"),
        (Energetic, "⚡", "Ready to take on something big"),
        (Calm, "😌", "Relaxed and steady"),
        (Stressed, "😰", "Under pressure"),
        (Focused, "🎯", "In the zone"),
        (Tired, "😴", "Running on empty"),
        (Neutral, "😐", "Nothing in particular"),
    ]
    .into_iter()
    .map(|(mood, emoji, description)| MoodInfo {
        mood,
        emoji,
        description,
    })
    .collect()
});

static SUGGESTIONS: Lazy<HashMap<Mood, MoodSuggestions>> = Lazy::new(|| {
    use Mood::*;
    use TaskCategory::*;
    let table: [(Mood, Vec<TaskCategory>, Vec<&'static str>); 8] = [
        (
            Happy,
            vec![Personal, Learning],
            vec!["Start that side project", "Reach out to a friend", "Plan something fun"],
        ),
        (
            Sad,
            vec![Health, Personal],
            vec!["Take a short walk", "Tidy one small corner", "Write down three good things"],
        ),
        (
            Energetic,
            vec![Work, Health],
            vec!["Tackle the hardest task first", "Go for a run", "Clear the backlog"],
        ),
        (
            Calm,
            vec![Learning, Personal],
            vec!["Read a chapter", "Review your week", "Organise notes"],
        ),
        (
            Stressed,
            vec![Health, Other],
            vec!["Break a big task into subtasks", "Do a five-minute breathing break", "Drop one low-priority item"],
        ),
        (
            Focused,
            vec![Work, Learning],
            vec!["Deep work on a single task", "Finish something in progress", "Write documentation"],
        ),
        (
            Tired,
            vec![Shopping, Personal],
            vec!["Pick quick wins only", "Prepare tomorrow's list", "Rest"],
        ),
        (
            Neutral,
            vec![Work, Personal],
            vec!["Review overdue tasks", "Sort tasks by priority", "Pick one task and start"],
        ),
    ];

    table
        .into_iter()
        .map(|(mood, categories, ideas)| {
            (
                mood,
                MoodSuggestions {
                    mood,
                    categories,
                    ideas,
                },
            )
        })
        .collect()
});

static WEATHER: Lazy<HashMap<&'static str, WeatherSuggestions>> = Lazy::new(|| {
    use Mood::*;
    let table: [(&'static str, Vec<Mood>, Vec<&'static str>); 6] = [
        ("sunny", vec![Happy, Energetic], vec!["Do errands outside", "Exercise outdoors"]),
        ("cloudy", vec![Calm, Neutral], vec!["Catch up on admin", "Plan the week"]),
        ("rainy", vec![Calm, Focused, Sad], vec!["Read or study", "Deep work at home"]),
        ("snowy", vec![Calm, Tired], vec!["Cook something warm", "Organise the house"]),
        ("stormy", vec![Stressed, Tired], vec!["Stay in and rest", "Handle small tasks"]),
        ("windy", vec![Energetic, Neutral], vec!["Short walk", "Quick chores"]),
    ];

    table
        .into_iter()
        .map(|(condition, moods, ideas)| {
            (
                condition,
                WeatherSuggestions {
                    condition,
                    moods,
                    ideas,
                },
            )
        })
        .collect()
});

/// Every mood, in declaration order
pub fn all_moods() -> &'static [MoodInfo] {
    &MOODS
}

pub fn suggestions_for(mood: Mood) -> Option<&'static MoodSuggestions> {
    SUGGESTIONS.get(&mood)
}

/// Suggestions for a weather condition such as `sunny` or `rainy` (case-insensitive)
pub fn weather_suggestions(condition: &str) -> Option<&'static WeatherSuggestions> {
    WEATHER.get(condition.trim().to_lowercase().as_str())
}

/// Known weather condition names, sorted
pub fn weather_conditions() -> Vec<&'static str> {
    let mut names: Vec<_> = WEATHER.keys().copied().collect();
    names.sort_unstable();
    names
}
