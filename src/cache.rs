//! In-memory store of fetched aggregates, scoped by class and period.
//! Versions are monotonically increasing per `(class_id, kind)` and are
//! never reused or decremented; counters survive invalidation so a
//! repopulated entry is always strictly newer than anything a consumer
//! has seen. Consumers key rendering on `(kind, version)` and treat an
//! update as a full replacement, never an in-place patch.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateKind {
    Grades,
    GradeStats,
    FinalGrades,
    Predictions,
    AttendanceStats,
    ParticipationStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub class_id: i64,
    pub period_id: Option<i64>,
    pub kind: AggregateKind,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub version: u64,
}

#[derive(Debug, Default)]
pub struct ViewStateCache {
    entries: HashMap<CacheKey, CacheEntry>,
    versions: HashMap<(i64, AggregateKind), u64>,
}

impl ViewStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class_id: i64, period_id: Option<i64>, kind: AggregateKind) -> Option<&CacheEntry> {
        self.entries.get(&CacheKey {
            class_id,
            period_id,
            kind,
        })
    }

    /// Stores a payload and returns its freshly assigned version.
    pub fn put(
        &mut self,
        class_id: i64,
        period_id: Option<i64>,
        kind: AggregateKind,
        payload: serde_json::Value,
    ) -> u64 {
        let counter = self.versions.entry((class_id, kind)).or_insert(0);
        *counter += 1;
        let version = *counter;
        self.entries.insert(
            CacheKey {
                class_id,
                period_id,
                kind,
            },
            CacheEntry { payload, version },
        );
        version
    }

    /// Drops every entry for the class across all kinds and periods. A
    /// single period's grades can move a class-wide aggregate, so
    /// invalidation is never narrower than the class.
    pub fn invalidate_class(&mut self, class_id: i64) {
        self.entries.retain(|key, _| key.class_id != class_id);
    }

    pub fn invalidate(&mut self, class_id: i64, kind: AggregateKind) {
        self.entries.retain(|key, _| key.class_id != class_id || key.kind != kind);
    }

    /// Last version handed out for `(class_id, kind)`, whether or not the
    /// entry is currently populated.
    pub fn version(&self, class_id: i64, kind: AggregateKind) -> u64 {
        self.versions.get(&(class_id, kind)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn versions_increase_monotonically_per_class_and_kind() {
        let mut cache = ViewStateCache::new();
        let v1 = cache.put(1, Some(10), AggregateKind::Grades, json!([]));
        let v2 = cache.put(1, Some(10), AggregateKind::Grades, json!([1]));
        let other = cache.put(2, Some(10), AggregateKind::Grades, json!([]));
        assert!(v2 > v1);
        assert_eq!(other, 1);
        assert_eq!(cache.version(1, AggregateKind::Grades), v2);
    }

    #[test]
    fn invalidate_class_clears_all_kinds_but_keeps_counters() {
        let mut cache = ViewStateCache::new();
        cache.put(1, Some(10), AggregateKind::Grades, json!([]));
        cache.put(1, Some(10), AggregateKind::GradeStats, json!([]));
        cache.put(1, None, AggregateKind::FinalGrades, json!([]));
        cache.put(9, None, AggregateKind::FinalGrades, json!(["other"]));

        cache.invalidate_class(1);

        assert!(cache.get(1, Some(10), AggregateKind::Grades).is_none());
        assert!(cache.get(1, Some(10), AggregateKind::GradeStats).is_none());
        assert!(cache.get(1, None, AggregateKind::FinalGrades).is_none());
        assert!(cache.get(9, None, AggregateKind::FinalGrades).is_some());

        // Counter survives: the next publication is strictly newer.
        let v = cache.put(1, Some(10), AggregateKind::Grades, json!([2]));
        assert_eq!(v, 2);
    }

    #[test]
    fn single_kind_invalidation_leaves_siblings() {
        let mut cache = ViewStateCache::new();
        cache.put(1, None, AggregateKind::Predictions, json!([]));
        cache.put(1, None, AggregateKind::FinalGrades, json!([]));
        cache.invalidate(1, AggregateKind::Predictions);
        assert!(cache.get(1, None, AggregateKind::Predictions).is_none());
        assert!(cache.get(1, None, AggregateKind::FinalGrades).is_some());
    }

    #[test]
    fn period_scoping_is_part_of_the_key() {
        let mut cache = ViewStateCache::new();
        cache.put(1, Some(10), AggregateKind::Grades, json!(["p10"]));
        cache.put(1, Some(11), AggregateKind::Grades, json!(["p11"]));
        assert_eq!(
            cache.get(1, Some(10), AggregateKind::Grades).unwrap().payload,
            json!(["p10"])
        );
        assert_eq!(
            cache.get(1, Some(11), AggregateKind::Grades).unwrap().payload,
            json!(["p11"])
        );
    }
}
