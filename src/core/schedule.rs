//! Ordered day list shared by itineraries and tour templates.
//!
//! Day numbers are always `1..=N` with no gaps. Every mutation that can
//! disturb the numbering renumbers before returning, so an aggregate saved
//! after any of these calls is contiguous.

use crate::domain::model::{AutoFillOutcome, CombinationContent, Day, DayPatch};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{
    validate_contiguous_numbers, validate_non_empty_string, validate_range,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACEHOLDER_TITLE: &str = "Day {n}";
pub const DEFAULT_MAX_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRules {
    pub placeholder_title: String,
    pub max_days: u32,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

impl ScheduleRules {
    pub fn title_for(&self, day_number: u32) -> String {
        self.placeholder_title.replace("{n}", &day_number.to_string())
    }

    fn placeholder(&self, day_number: u32) -> Day {
        Day::placeholder(day_number, self.title_for(day_number))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Day>", into = "Vec<Day>")]
pub struct DaySchedule {
    days: Vec<Day>,
}

impl DaySchedule {
    pub fn with_days(count: u32, rules: &ScheduleRules) -> Result<Self> {
        validate_range("number_of_days", count, 1, rules.max_days)?;
        Ok(Self {
            days: (1..=count).map(|n| rules.placeholder(n)).collect(),
        })
    }

    /// Accepts caller-supplied days only if their numbers are already `1..=N`.
    pub fn from_days(days: Vec<Day>) -> Result<Self> {
        let numbers: Vec<u32> = days.iter().map(|d| d.day_number).collect();
        validate_contiguous_numbers("days", &numbers)?;
        Ok(Self { days })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn day(&self, day_number: u32) -> Result<&Day> {
        self.days
            .iter()
            .find(|d| d.day_number == day_number)
            .ok_or_else(|| EngineError::not_found("Day", day_number))
    }

    fn day_mut(&mut self, day_number: u32) -> Result<&mut Day> {
        self.days
            .iter_mut()
            .find(|d| d.day_number == day_number)
            .ok_or_else(|| EngineError::not_found("Day", day_number))
    }

    pub fn is_contiguous(&self) -> bool {
        self.days
            .iter()
            .enumerate()
            .all(|(i, d)| d.day_number == i as u32 + 1)
    }

    /// Appends a placeholder day and returns its number.
    pub fn add_day(&mut self, rules: &ScheduleRules) -> Result<u32> {
        let next = self.days.len() as u32 + 1;
        if next > rules.max_days {
            return Err(EngineError::validation(
                "number_of_days",
                format!("cannot exceed {} days", rules.max_days),
            ));
        }
        self.days.push(rules.placeholder(next));
        Ok(next)
    }

    /// Removes a day and closes the gap. The last remaining day cannot be
    /// removed.
    pub fn remove_day(&mut self, day_number: u32) -> Result<Day> {
        let index = self
            .days
            .iter()
            .position(|d| d.day_number == day_number)
            .ok_or_else(|| EngineError::not_found("Day", day_number))?;

        if self.days.len() == 1 {
            return Err(EngineError::validation(
                "days",
                "an itinerary must keep at least one day",
            ));
        }

        let removed = self.days.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Moves a day to a new position and renumbers everything.
    pub fn move_day(&mut self, from: u32, to: u32) -> Result<()> {
        let index = self
            .days
            .iter()
            .position(|d| d.day_number == from)
            .ok_or_else(|| EngineError::not_found("Day", from))?;
        validate_range("target_day_number", to, 1, self.days.len() as u32)?;

        let day = self.days.remove(index);
        self.days.insert(to as usize - 1, day);
        self.renumber();
        Ok(())
    }

    /// Reassigns `1..=N` in current list order.
    pub fn renumber(&mut self) {
        for (i, day) in self.days.iter_mut().enumerate() {
            day.day_number = i as u32 + 1;
        }
    }

    /// Regenerates the list for a new duration. Days `1..=min(old, new)` are
    /// kept as they are. Returns whether anything changed.
    pub fn resize(&mut self, target: u32, rules: &ScheduleRules) -> Result<bool> {
        validate_range("number_of_days", target, 1, rules.max_days)?;

        let current = self.days.len() as u32;
        if current == target && self.is_contiguous() {
            return Ok(false);
        }

        self.days.truncate(target as usize);
        self.renumber();
        for n in current + 1..=target {
            self.days.push(rules.placeholder(n));
        }
        Ok(true)
    }

    /// Applies a human edit. Narrative edits mark the field as custom so that
    /// later auto-fill leaves it alone.
    pub fn update_day(&mut self, day_number: u32, patch: DayPatch) -> Result<()> {
        if let Some(title) = &patch.title {
            validate_non_empty_string("title", title)?;
        }

        let day = self.day_mut(day_number)?;
        if let Some(title) = patch.title {
            day.title = title;
        }
        if let Some(description) = patch.description {
            day.description = description;
            day.is_description_custom = true;
        }
        if let Some(activities) = patch.activities {
            day.activities = activities;
            day.is_activity_custom = true;
        }
        if let Some(meals) = patch.meals_included {
            day.meals_included = meals;
        }
        if let Some(destination_ids) = patch.destination_ids {
            day.destination_ids = destination_ids;
        }
        if let Some(accommodation_id) = patch.accommodation_id {
            day.accommodation_id = accommodation_id;
        }
        if let Some(image_url) = patch.atmospheric_image_url {
            day.atmospheric_image_url = image_url;
        }
        Ok(())
    }

    /// Installs resolved matrix content on a day, skipping fields a human has
    /// edited.
    pub fn auto_fill(
        &mut self,
        day_number: u32,
        content: &CombinationContent,
    ) -> Result<AutoFillOutcome> {
        let day = self.day_mut(day_number)?;
        if day.destination_ids.is_empty() || content.is_empty() {
            return Ok(AutoFillOutcome::NoContentFound);
        }

        let mut description_updated = false;
        if !day.is_description_custom {
            if let Some(description) = &content.description {
                if day.description != *description {
                    day.description = description.clone();
                    description_updated = true;
                }
            }
        }

        let mut activity_updated = false;
        if !day.is_activity_custom {
            if let Some(activity) = &content.activity {
                if day.activities != *activity {
                    day.activities = activity.clone();
                    activity_updated = true;
                }
            }
        }

        Ok(AutoFillOutcome::Applied {
            description_updated,
            activity_updated,
        })
    }

    /// Hands a day's narrative back to auto-fill.
    pub fn release_custom_content(&mut self, day_number: u32) -> Result<()> {
        let day = self.day_mut(day_number)?;
        day.is_description_custom = false;
        day.is_activity_custom = false;
        Ok(())
    }
}

impl TryFrom<Vec<Day>> for DaySchedule {
    type Error = EngineError;

    fn try_from(days: Vec<Day>) -> Result<Self> {
        Self::from_days(days)
    }
}

impl From<DaySchedule> for Vec<Day> {
    fn from(schedule: DaySchedule) -> Self {
        schedule.days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DestinationId;

    fn numbers(schedule: &DaySchedule) -> Vec<u32> {
        schedule.days().iter().map(|d| d.day_number).collect()
    }

    fn schedule(count: u32) -> DaySchedule {
        DaySchedule::with_days(count, &ScheduleRules::default()).unwrap()
    }

    #[test]
    fn test_add_day_uses_placeholder_title() {
        let mut days = schedule(2);
        let n = days.add_day(&ScheduleRules::default()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(days.day(3).unwrap().title, "Day 3");
    }

    #[test]
    fn test_remove_middle_day_renumbers() {
        let mut days = schedule(4);
        days.update_day(3, DayPatch { title: Some("Lisbon".to_string()), ..Default::default() })
            .unwrap();

        let removed = days.remove_day(2).unwrap();
        assert_eq!(removed.title, "Day 2");
        assert_eq!(numbers(&days), vec![1, 2, 3]);
        assert_eq!(days.day(2).unwrap().title, "Lisbon");
    }

    #[test]
    fn test_cannot_remove_last_day() {
        let mut days = schedule(1);
        assert!(matches!(
            days.remove_day(1),
            Err(EngineError::ValidationError { .. })
        ));
        assert!(matches!(
            days.remove_day(7),
            Err(EngineError::NotFoundError { .. })
        ));
    }

    #[test]
    fn test_resize_preserves_overlap_and_is_idempotent() {
        let rules = ScheduleRules::default();
        let mut days = schedule(3);
        let patch = DayPatch {
            description: Some("Hand written".to_string()),
            ..Default::default()
        };
        days.update_day(2, patch).unwrap();
        let before = days.day(2).unwrap().clone();

        assert!(days.resize(5, &rules).unwrap());
        assert_eq!(numbers(&days), vec![1, 2, 3, 4, 5]);
        assert_eq!(days.day(2).unwrap(), &before);
        assert_eq!(days.day(5).unwrap().title, "Day 5");

        let snapshot = days.clone();
        assert!(!days.resize(5, &rules).unwrap());
        assert_eq!(days, snapshot);

        assert!(days.resize(2, &rules).unwrap());
        assert_eq!(numbers(&days), vec![1, 2]);
        assert_eq!(days.day(2).unwrap(), &before);

        assert!(days.resize(0, &rules).is_err());
    }

    #[test]
    fn test_move_day_keeps_numbering_contiguous() {
        let mut days = schedule(3);
        days.update_day(3, DayPatch { title: Some("Porto".to_string()), ..Default::default() })
            .unwrap();
        days.move_day(3, 1).unwrap();
        assert_eq!(numbers(&days), vec![1, 2, 3]);
        assert_eq!(days.day(1).unwrap().title, "Porto");
        assert!(days.move_day(1, 4).is_err());
    }

    #[test]
    fn test_from_days_rejects_gaps() {
        let rules = ScheduleRules::default();
        let ok = vec![
            Day::placeholder(1, rules.title_for(1)),
            Day::placeholder(2, rules.title_for(2)),
        ];
        assert!(DaySchedule::from_days(ok).is_ok());

        let gap = vec![
            Day::placeholder(1, rules.title_for(1)),
            Day::placeholder(3, rules.title_for(3)),
        ];
        assert!(DaySchedule::from_days(gap).is_err());

        let json = r#"[{
            "day_number": 2, "title": "x", "description": "", "activities": "",
            "meals_included": "", "destination_ids": [], "accommodation_id": null,
            "atmospheric_image_url": null
        }]"#;
        assert!(serde_json::from_str::<DaySchedule>(json).is_err());
    }

    #[test]
    fn test_auto_fill_respects_custom_flags() {
        let mut days = schedule(1);
        let content = CombinationContent {
            description: Some("Auto text".to_string()),
            activity: Some("Auto activity".to_string()),
        };

        assert_eq!(days.auto_fill(1, &content).unwrap(), AutoFillOutcome::NoContentFound);

        let patch = DayPatch {
            destination_ids: Some(vec![DestinationId::new()]),
            ..Default::default()
        };
        days.update_day(1, patch).unwrap();
        assert_eq!(
            days.auto_fill(1, &content).unwrap(),
            AutoFillOutcome::Applied { description_updated: true, activity_updated: true }
        );

        days.update_day(1, DayPatch { description: Some("Mine".to_string()), ..Default::default() })
            .unwrap();
        let changed = CombinationContent {
            description: Some("Other auto text".to_string()),
            activity: Some("Other activity".to_string()),
        };
        assert_eq!(
            days.auto_fill(1, &changed).unwrap(),
            AutoFillOutcome::Applied { description_updated: false, activity_updated: true }
        );
        assert_eq!(days.day(1).unwrap().description, "Mine");

        days.release_custom_content(1).unwrap();
        days.auto_fill(1, &changed).unwrap();
        assert_eq!(days.day(1).unwrap().description, "Other auto text");
    }
}
