use lazy_static::lazy_static;
use regex::Regex;
use time::Date;

use super::dto::ListQuery;
use super::repo_types::UserRecord;

lazy_static! {
    static ref NON_DIAL_CHARS: Regex = Regex::new(r"[^\d+]").unwrap();
    static ref DAY_MONTH_RE: Regex = Regex::new(r"^(\d{2})/(\d{2})$").unwrap();
}

/// `https://wa.me/<number>` with everything but digits and `+` removed.
pub fn whatsapp_link(mobile: &str) -> Option<String> {
    let cleaned = NON_DIAL_CHARS.replace_all(mobile, "");
    if cleaned.is_empty() {
        return None;
    }
    Some(format!("https://wa.me/{cleaned}"))
}

/// A recurring calendar day, written `DD/MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMonth {
    pub day: u8,
    pub month: u8,
}

impl DayMonth {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = DAY_MONTH_RE.captures(raw.trim())?;
        let day: u8 = caps[1].parse().ok()?;
        let month: u8 = caps[2].parse().ok()?;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { day, month })
    }

    pub fn matches(&self, date: Date) -> bool {
        date.day() == self.day && u8::from(date.month()) == self.month
    }
}

/// Server-side version of the dashboard's search and birthday/anniversary filters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListFilter {
    search: Option<String>,
    dob: Option<DayMonth>,
    anniversary: Option<DayMonth>,
}

impl ListFilter {
    /// `None` when a date filter is not a valid `DD/MM`.
    pub fn from_query(query: &ListQuery) -> Option<Self> {
        let day_month = |raw: &Option<String>| -> Option<Option<DayMonth>> {
            match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => DayMonth::parse(v).map(Some),
                None => Some(None),
            }
        };
        Some(Self {
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
            dob: day_month(&query.dob)?,
            anniversary: day_month(&query.anniversary)?,
        })
    }

    pub fn matches(&self, user: &UserRecord) -> bool {
        if let Some(term) = &self.search {
            let hit = user.first_name.to_lowercase().contains(term)
                || user.last_name.to_lowercase().contains(term);
            if !hit {
                return false;
            }
        }

        let dob_hit = self
            .dob
            .map(|f| user.dob.is_some_and(|d| f.matches(d)));
        let anniversary_hit = self
            .anniversary
            .map(|f| user.anniversary_date.is_some_and(|d| f.matches(d)));

        // with both date filters set, either one matching is enough
        match (dob_hit, anniversary_hit) {
            (None, None) => true,
            (Some(a), None) | (None, Some(a)) => a,
            (Some(a), Some(b)) => a || b,
        }
    }

    pub fn apply(&self, users: Vec<UserRecord>) -> Vec<UserRecord> {
        users.into_iter().filter(|u| self.matches(u)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn user(first: &str, last: &str, dob: Option<Date>, anniversary: Option<Date>) -> UserRecord {
        UserRecord {
            id: 1,
            first_name: first.into(),
            last_name: last.into(),
            dob,
            anniversary_date: anniversary,
            mobile_number: None,
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn filter(search: Option<&str>, dob: Option<&str>, anniversary: Option<&str>) -> ListFilter {
        ListFilter::from_query(&ListQuery {
            search: search.map(Into::into),
            dob: dob.map(Into::into),
            anniversary: anniversary.map(Into::into),
        })
        .unwrap()
    }

    #[test]
    fn whatsapp_link_strips_formatting() {
        assert_eq!(
            whatsapp_link("+91 (987) 654-3210").as_deref(),
            Some("https://wa.me/+919876543210")
        );
        assert_eq!(whatsapp_link("n/a"), None);
    }

    #[test]
    fn day_month_rejects_garbage() {
        assert_eq!(DayMonth::parse("05/11"), Some(DayMonth { day: 5, month: 11 }));
        assert_eq!(DayMonth::parse("5/11"), None);
        assert_eq!(DayMonth::parse("32/01"), None);
        assert_eq!(DayMonth::parse("01/13"), None);
        assert!(ListFilter::from_query(&ListQuery {
            dob: Some("tomorrow".into()),
            ..Default::default()
        })
        .is_none());
    }

    #[test]
    fn search_is_case_insensitive_on_either_name() {
        let f = filter(Some("LOVE"), None, None);
        assert!(f.matches(&user("Ada", "Lovelace", None, None)));
        assert!(!f.matches(&user("Alan", "Turing", None, None)));
    }

    #[test]
    fn both_date_filters_match_either() {
        let f = filter(None, Some("10/12"), Some("01/01"));
        assert!(f.matches(&user("A", "B", Some(date!(1815 - 12 - 10)), None)));
        assert!(f.matches(&user("A", "B", None, Some(date!(2000 - 01 - 01)))));
        assert!(!f.matches(&user("A", "B", Some(date!(1815 - 12 - 11)), None)));
    }

    #[test]
    fn single_date_filter_requires_that_date() {
        let f = filter(None, None, Some("15/06"));
        assert!(!f.matches(&user("A", "B", Some(date!(1990 - 06 - 15)), None)));
        assert!(f.matches(&user("A", "B", None, Some(date!(2010 - 06 - 15)))));
    }

    #[test]
    fn search_narrows_before_dates() {
        let f = filter(Some("ada"), Some("10/12"), None);
        let users = vec![
            user("Ada", "Lovelace", Some(date!(1815 - 12 - 10)), None),
            user("Grace", "Hopper", Some(date!(1906 - 12 - 10)), None),
        ];
        let out = f.apply(users);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].first_name, "Ada");
    }
}
