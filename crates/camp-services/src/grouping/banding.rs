//! Splitting a sorted camper list into contiguous, even bands

use std::cmp::Ordering;

use camp_core::Id;
use camp_db::Camper;
use camp_models::{Athlete, GroupStrategy};

/// A planned group before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    pub name: String,
    pub coach_id: Option<Id>,
    /// `(registration_id, athlete_id)` in placement order
    pub members: Vec<(Id, Id)>,
}

fn by_name(a: &Athlete, b: &Athlete) -> Ordering {
    a.last_name
        .to_lowercase()
        .cmp(&b.last_name.to_lowercase())
        .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        .then(a.id.cmp(&b.id))
}

pub fn sort_candidates(candidates: &mut [Camper], strategy: GroupStrategy) {
    match strategy {
        // oldest first
        GroupStrategy::Age => candidates.sort_by(|a, b| {
            a.athlete
                .birth_date
                .cmp(&b.athlete.birth_date)
                .then_with(|| by_name(&a.athlete, &b.athlete))
        }),
        // campers without a grade go last
        GroupStrategy::Grade => candidates.sort_by(|a, b| {
            let grade = |c: &Camper| (c.athlete.grade.is_none(), c.athlete.grade);
            grade(a)
                .cmp(&grade(b))
                .then(a.athlete.birth_date.cmp(&b.athlete.birth_date))
                .then_with(|| by_name(&a.athlete, &b.athlete))
        }),
        GroupStrategy::Alphabetical => {
            candidates.sort_by(|a, b| by_name(&a.athlete, &b.athlete))
        }
    }
}

/// `ceil(count / max)` sizes differing by at most one, larger ones first
pub fn band_sizes(count: usize, max_group_size: usize) -> Vec<usize> {
    if count == 0 || max_group_size == 0 {
        return Vec::new();
    }
    let groups = count.div_ceil(max_group_size);
    let base = count / groups;
    let extra = count % groups;
    (0..groups)
        .map(|index| if index < extra { base + 1 } else { base })
        .collect()
}

/// `Group A` to `Group Z`, then `Group 27`, `Group 28`, ...
pub fn group_name(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => format!("Group {}", char::from(b'A' + i)),
        _ => format!("Group {}", index + 1),
    }
}

/// Sort, band and name; coaches are dealt round-robin
pub fn plan_groups(
    mut candidates: Vec<Camper>,
    strategy: GroupStrategy,
    max_group_size: usize,
    coaches: &[Id],
) -> Vec<PlannedGroup> {
    sort_candidates(&mut candidates, strategy);

    let mut remaining = candidates.into_iter();
    band_sizes(remaining.len(), max_group_size)
        .into_iter()
        .enumerate()
        .map(|(index, size)| PlannedGroup {
            name: group_name(index),
            coach_id: if coaches.is_empty() {
                None
            } else {
                Some(coaches[index % coaches.len()])
            },
            members: remaining
                .by_ref()
                .take(size)
                .map(|c| (c.registration_id, c.athlete.id))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn candidate(id: Id, last: &str, first: &str, born: (i32, u32, u32), grade: Option<i32>) -> Camper {
        Camper {
            registration_id: id * 10,
            athlete: Athlete {
                id,
                tenant_id: 1,
                parent_id: 1,
                first_name: first.into(),
                last_name: last.into(),
                birth_date: NaiveDate::from_ymd_opt(born.0, born.1, born.2).unwrap(),
                grade,
                shirt_size: None,
                medical_notes: None,
                emergency_contact_name: "Contact".into(),
                emergency_contact_phone: "555-0100".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    fn ids(group: &PlannedGroup) -> Vec<Id> {
        group.members.iter().map(|(_, athlete)| *athlete).collect()
    }

    #[test]
    fn test_band_sizes_differ_by_at_most_one() {
        assert_eq!(band_sizes(10, 4), vec![4, 3, 3]);
        assert_eq!(band_sizes(12, 4), vec![4, 4, 4]);
        assert_eq!(band_sizes(13, 4), vec![4, 3, 3, 3]);
        assert_eq!(band_sizes(3, 10), vec![3]);
        assert!(band_sizes(0, 5).is_empty());

        for count in 1..60 {
            for max in 1..12 {
                let sizes = band_sizes(count, max);
                assert_eq!(sizes.iter().sum::<usize>(), count);
                assert_eq!(sizes.len(), count.div_ceil(max));
                let (lo, hi) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
                assert!(hi - lo <= 1 && *hi <= max);
            }
        }
    }

    #[test]
    fn test_group_names() {
        assert_eq!(group_name(0), "Group A");
        assert_eq!(group_name(25), "Group Z");
        assert_eq!(group_name(26), "Group 27");
        assert_eq!(group_name(300), "Group 301");
    }

    #[test]
    fn test_age_bands_oldest_first() {
        let campers = vec![
            candidate(1, "Young", "Ann", (2018, 1, 1), None),
            candidate(2, "Old", "Ben", (2014, 1, 1), None),
            candidate(3, "Mid", "Cal", (2016, 1, 1), None),
        ];
        let groups = plan_groups(campers, GroupStrategy::Age, 2, &[]);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[0]), vec![2, 3]);
        assert_eq!(ids(&groups[1]), vec![1]);
        assert_eq!(groups[0].members[0], (20, 2));
    }

    #[test]
    fn test_grade_then_birth_date_without_grade_last() {
        let campers = vec![
            candidate(1, "A", "A", (2015, 5, 1), Some(4)),
            candidate(2, "B", "B", (2015, 1, 1), Some(4)),
            candidate(3, "C", "C", (2016, 1, 1), None),
            candidate(4, "D", "D", (2017, 1, 1), Some(2)),
        ];
        let groups = plan_groups(campers, GroupStrategy::Grade, 10, &[]);
        assert_eq!(ids(&groups[0]), vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_alphabetical_ignores_case() {
        let campers = vec![
            candidate(1, "smith", "Zoe", (2015, 1, 1), None),
            candidate(2, "Adams", "Yan", (2015, 1, 1), None),
            candidate(3, "Smith", "Amy", (2015, 1, 1), None),
        ];
        let groups = plan_groups(campers, GroupStrategy::Alphabetical, 5, &[]);
        assert_eq!(ids(&groups[0]), vec![2, 3, 1]);
    }

    #[test]
    fn test_coaches_round_robin() {
        let campers = (1..=5)
            .map(|i| candidate(i, &format!("L{i}"), "F", (2015, 1, 1), None))
            .collect();
        let groups = plan_groups(campers, GroupStrategy::Alphabetical, 1, &[100, 200]);
        let coaches: Vec<Option<Id>> = groups.iter().map(|g| g.coach_id).collect();
        assert_eq!(coaches, vec![Some(100), Some(200), Some(100), Some(200), Some(100)]);
    }
}
