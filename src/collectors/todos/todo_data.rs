use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumIter, IntoEnumIterator};

pub const CARD_TITLE: &str = "TODO Items";
const CARD_ICON: &str = "list-todo";
const CARD_URL: &str = "/healthdeck/productivity/todos";

const HOTSPOT_COUNT: usize = 5;

/// More open items than this turn the card into a warning
const BUSY_ITEM_COUNT: usize = 20;

/// Kind of marker, in matching priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MarkerType {
    Todo,
    Fixme,
    Hack,
    Note,
    Bug,
}

impl MarkerType {
    const fn badge_color(self) -> BadgeColor {
        match self {
            Self::Fixme => BadgeColor::Warning,
            Self::Hack | Self::Bug => BadgeColor::Error,
            Self::Todo | Self::Note => BadgeColor::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Path relative to the project root, with forward slashes
    pub file_path: String,

    /// 1-based
    pub line_number: usize,
    pub marker_type: MarkerType,
    pub content_snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TodoStatus {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub file_path: String,
    pub count: usize,
}

/// Result of one scan of the project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoReport {
    pub items: Vec<TodoItem>,
    pub total_count: usize,
    pub by_type: BTreeMap<MarkerType, usize>,
    pub hotspots: Vec<Hotspot>,
    pub status: TodoStatus,
    pub scanned_at: DateTime<Utc>,
}

impl TodoReport {
    /// Summarize `items`, which are sorted by file and line first
    #[must_use]
    pub fn from_items(mut items: Vec<TodoItem>, scanned_at: DateTime<Utc>) -> Self {
        items.sort_by(|a, b| a.file_path.cmp(&b.file_path).then(a.line_number.cmp(&b.line_number)));

        let mut by_type = BTreeMap::new();
        let mut by_file: HashMap<&str, usize> = HashMap::new();
        for item in &items {
            *by_type.entry(item.marker_type).or_insert(0) += 1;
            *by_file.entry(item.file_path.as_str()).or_insert(0) += 1;
        }

        let mut hotspots: Vec<Hotspot> = by_file
            .into_iter()
            .map(|(file_path, count)| Hotspot {
                file_path: file_path.to_string(),
                count,
            })
            .collect();
        hotspots.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.file_path.cmp(&b.file_path)));
        hotspots.truncate(HOTSPOT_COUNT);

        Self {
            status: status_of(&items, &by_type),
            total_count: items.len(),
            items,
            by_type,
            hotspots,
            scanned_at,
        }
    }

    #[must_use]
    pub const fn card_status(&self) -> CardStatus {
        match self.status {
            TodoStatus::Success => CardStatus::Success,
            TodoStatus::Warning => CardStatus::Warning,
            TodoStatus::Error => CardStatus::Danger,
        }
    }

    fn display_value(&self) -> String {
        match self.total_count {
            0 => "No items found".to_string(),
            1 => "1 item".to_string(),
            n => format!("{n} items"),
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        let mut badges = vec![Badge::new(format!("{} Items", self.total_count), BadgeColor::Info)];
        for marker in MarkerType::iter() {
            if let Some(&count) = self.by_type.get(&marker)
                && count > 0
            {
                badges.push(Badge::new(format!("{marker}: {count}"), marker.badge_color()));
            }
        }
        badges
    }

    #[must_use]
    pub fn summary_card(&self) -> SummaryCard {
        SummaryCard {
            title: CARD_TITLE.to_string(),
            icon: CARD_ICON.to_string(),
            status: self.card_status(),
            display_value: self.display_value(),
            last_updated: self.scanned_at,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

fn status_of(items: &[TodoItem], by_type: &BTreeMap<MarkerType, usize>) -> TodoStatus {
    let has = |marker: MarkerType| by_type.get(&marker).is_some_and(|&count| count > 0);

    if items.is_empty() {
        TodoStatus::Success
    } else if has(MarkerType::Bug) || has(MarkerType::Hack) {
        TodoStatus::Error
    } else if has(MarkerType::Fixme) || items.len() > BUSY_ITEM_COUNT {
        TodoStatus::Warning
    } else {
        TodoStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(file_path: &str, line_number: usize, marker_type: MarkerType) -> TodoItem {
        TodoItem {
            file_path: file_path.to_string(),
            line_number,
            marker_type,
            content_snippet: "something".to_string(),
        }
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = TodoReport::from_items(Vec::new(), Utc::now());
        assert_eq!(report.status, TodoStatus::Success);
        assert_eq!(report.summary_card().display_value, "No items found");
        assert_eq!(report.badges(), vec![Badge::new("0 Items", BadgeColor::Info)]);
    }

    #[test]
    fn test_status_rules() {
        let now = Utc::now();
        let todos = |n: usize| (1..=n).map(|line| item("a.rb", line, MarkerType::Todo)).collect::<Vec<_>>();

        assert_eq!(TodoReport::from_items(todos(20), now).status, TodoStatus::Success);
        assert_eq!(TodoReport::from_items(todos(21), now).status, TodoStatus::Warning);
        assert_eq!(
            TodoReport::from_items(vec![item("a.rb", 1, MarkerType::Fixme)], now).status,
            TodoStatus::Warning
        );

        let report = TodoReport::from_items(vec![item("a.rb", 1, MarkerType::Note), item("b.rb", 3, MarkerType::Hack)], now);
        assert_eq!(report.status, TodoStatus::Error);
        assert_eq!(report.card_status(), CardStatus::Danger);
    }

    #[test]
    fn test_items_sorted_and_hotspots_ranked() {
        let items = vec![
            item("b.rb", 9, MarkerType::Todo),
            item("a.rb", 7, MarkerType::Todo),
            item("b.rb", 2, MarkerType::Note),
            item("c.rb", 1, MarkerType::Todo),
            item("d.rb", 1, MarkerType::Todo),
            item("e.rb", 1, MarkerType::Todo),
            item("f.rb", 1, MarkerType::Todo),
        ];

        let report = TodoReport::from_items(items, Utc::now());
        assert_eq!((report.items[0].file_path.as_str(), report.items[0].line_number), ("a.rb", 7));
        assert_eq!((report.items[1].file_path.as_str(), report.items[1].line_number), ("b.rb", 2));

        assert_eq!(report.hotspots.len(), 5);
        assert_eq!(
            report.hotspots[0],
            Hotspot {
                file_path: "b.rb".to_string(),
                count: 2
            }
        );
        assert_eq!(report.hotspots[1].file_path, "a.rb");
    }

    #[test]
    fn test_badges_per_type() {
        let report = TodoReport::from_items(
            vec![
                item("a.rb", 1, MarkerType::Bug),
                item("a.rb", 2, MarkerType::Todo),
                item("a.rb", 3, MarkerType::Fixme),
                item("a.rb", 4, MarkerType::Todo),
            ],
            Utc::now(),
        );

        assert_eq!(
            report.badges(),
            vec![
                Badge::new("4 Items", BadgeColor::Info),
                Badge::new("TODO: 2", BadgeColor::Info),
                Badge::new("FIXME: 1", BadgeColor::Warning),
                Badge::new("BUG: 1", BadgeColor::Error),
            ]
        );
        assert_eq!(report.summary_card().display_value, "4 items");
    }
}
