// Resolution of saved widget ids into an ordered, capacity-bounded render set
use crate::domain::display::SENTINEL_EMPTY;
use crate::domain::widget::{WidgetId, WidgetRecord};
use std::collections::{HashMap, HashSet};

/// Outcome of resolving a user's display configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Records to render, in the user's saved order.
    Widgets(Vec<WidgetRecord>),
    /// The user chose no widgets, or none of the chosen ones still exist.
    /// Renders the single fallback panel.
    Empty,
    /// No display configuration has ever been saved.
    Unconfigured,
}

impl Resolution {
    /// Apply a smaller capacity after a layout change. Trailing records are
    /// dropped; the tags are unaffected.
    pub fn truncate(self, capacity: usize) -> Self {
        match self {
            Resolution::Widgets(mut records) => {
                records.truncate(capacity);
                Resolution::Widgets(records)
            }
            other => other,
        }
    }

    pub fn widget_ids(&self) -> Vec<WidgetId> {
        match self {
            Resolution::Widgets(records) => records.iter().map(|r| r.id).collect(),
            _ => Vec::new(),
        }
    }
}

/// Resolve saved ids against the records the user currently owns.
///
/// `saved_ids` is `None` when the user has no display row at all. Duplicates
/// keep their first position, ids with no matching record are dropped, and the
/// result never exceeds `capacity`.
pub fn resolve(
    saved_ids: Option<&[WidgetId]>,
    records: &[WidgetRecord],
    capacity: usize,
) -> Resolution {
    let Some(saved_ids) = saved_ids else {
        return Resolution::Unconfigured;
    };

    let mut seen = HashSet::new();
    let ids: Vec<WidgetId> = saved_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if ids == [SENTINEL_EMPTY] {
        return Resolution::Empty;
    }

    let by_id: HashMap<WidgetId, &WidgetRecord> = records.iter().map(|r| (r.id, r)).collect();
    let resolved: Vec<WidgetRecord> = ids
        .iter()
        .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
        .take(capacity)
        .collect();

    if resolved.is_empty() {
        tracing::debug!(
            "None of {} saved widget ids matched a record; using fallback panel",
            ids.len()
        );
        Resolution::Empty
    } else {
        Resolution::Widgets(resolved)
    }
}

/// Render set used before any configuration is saved: the first `capacity`
/// records in id order.
pub fn default_widgets(records: &[WidgetRecord], capacity: usize) -> Vec<WidgetRecord> {
    let mut sorted: Vec<WidgetRecord> = records.to_vec();
    sorted.sort_by_key(|r| r.id);
    sorted.truncate(capacity);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(ids: &[WidgetId]) -> Vec<WidgetRecord> {
        ids.iter()
            .map(|id| WidgetRecord {
                id: *id,
                title: Some(format!("Widget {}", id)),
                widget_type: "calendar".to_string(),
                configuration: None,
                requires_configuration: true,
            })
            .collect()
    }

    fn saved(ids: &[WidgetId]) -> Option<&[WidgetId]> {
        Some(ids)
    }

    #[test]
    fn test_sentinel_is_empty_regardless_of_records() {
        assert_eq!(resolve(saved(&[-1]), &records(&[1, 2]), 6), Resolution::Empty);
        assert_eq!(resolve(saved(&[-1]), &[], 6), Resolution::Empty);
    }

    #[test]
    fn test_padded_sentinel_dedupes_to_empty() {
        assert_eq!(
            resolve(saved(&[-1, -1, -1, -1, -1, -1]), &records(&[1]), 6),
            Resolution::Empty
        );
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let resolution = resolve(saved(&[5, 5, 7]), &records(&[5, 7]), 6);
        assert_eq!(resolution.widget_ids(), vec![5, 7]);
    }

    #[test]
    fn test_dangling_reference_falls_back_to_empty() {
        assert_eq!(resolve(saved(&[9]), &[], 6), Resolution::Empty);
    }

    #[test]
    fn test_saved_empty_list_is_empty_not_unconfigured() {
        assert_eq!(resolve(saved(&[]), &records(&[1]), 6), Resolution::Empty);
    }

    #[test]
    fn test_never_saved_is_unconfigured() {
        assert_eq!(resolve(None, &records(&[1, 2]), 6), Resolution::Unconfigured);
    }

    #[test]
    fn test_deleted_record_scenario() {
        let owned = records(&[1, 2, 3, 4, 5, 6]);
        let resolution = resolve(saved(&[3, 1, 4, 1, 5, 9, 2, 6]), &owned, 6);
        assert_eq!(resolution.widget_ids(), vec![3, 1, 4, 5, 2, 6]);
    }

    #[test]
    fn test_saved_order_beats_id_order() {
        let resolution = resolve(saved(&[6, 2, 4]), &records(&[2, 4, 6]), 6);
        assert_eq!(resolution.widget_ids(), vec![6, 2, 4]);
    }

    #[test]
    fn test_sentinel_mixed_with_ids_is_dropped() {
        let resolution = resolve(saved(&[3, -1, -1]), &records(&[3]), 6);
        assert_eq!(resolution.widget_ids(), vec![3]);
    }

    #[test]
    fn test_output_never_exceeds_capacity() {
        let owned = records(&(1..=20).collect::<Vec<_>>());
        let inputs: Vec<Vec<WidgetId>> = vec![
            (1..=20).collect(),
            (1..=20).rev().collect(),
            vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7],
            vec![-1, 1, 2, 3, 4, 5, 6, 7, 8],
        ];

        for capacity in 0..8 {
            for ids in &inputs {
                let resolution = resolve(saved(ids), &owned, capacity);
                assert!(resolution.widget_ids().len() <= capacity);
            }
        }
    }

    #[test]
    fn test_truncate_after_capacity_decrease() {
        let resolution = resolve(saved(&[1, 2, 3, 4, 5, 6]), &records(&[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(resolution.truncate(4).widget_ids(), vec![1, 2, 3, 4]);
        assert_eq!(Resolution::Empty.truncate(4), Resolution::Empty);
    }

    #[test]
    fn test_default_widgets_take_lowest_ids() {
        let defaults = default_widgets(&records(&[9, 3, 7, 1]), 3);
        let ids: Vec<WidgetId> = defaults.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 7]);
    }
}
