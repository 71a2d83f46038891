use std::collections::BTreeSet;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{DateKey, WeekStart};

/// First day of a month; the calendar shows one of these at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn containing(date: NaiveDate) -> Self {
        // Day 1 always exists for a month that already contains `date`.
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .0
            .checked_sub_days(Days::new(1))
            .unwrap_or(self.0)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    /// Moves by whole months, saturating at the ends of chrono's date range.
    pub fn shift(&self, months: i32) -> Self {
        let delta = Months::new(months.unsigned_abs());
        let moved = if months >= 0 {
            self.0.checked_add_months(delta)
        } else {
            self.0.checked_sub_months(delta)
        };
        moved.map(Self).unwrap_or(*self)
    }

    pub fn title(&self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: DateKey,
    pub day: u32,
    pub in_month: bool,
    pub marked: bool,
    pub selected: bool,
    pub today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub title: String,
    pub weekday_labels: Vec<String>,
    pub weeks: Vec<Vec<DayCell>>,
}

/// Whole weeks covering `month`, padded with the neighbouring months' days.
pub fn month_grid(
    month: YearMonth,
    week_start: WeekStart,
    marked: &BTreeSet<DateKey>,
    selected: Option<DateKey>,
    today: NaiveDate,
) -> MonthGrid {
    let first_weekday = week_start.weekday();
    let lead = days_after(month.first_day().weekday(), first_weekday);
    let trail = 6 - days_after(month.last_day().weekday(), first_weekday);
    let start = month
        .first_day()
        .checked_sub_days(Days::new(lead.into()))
        .unwrap_or(month.first_day());
    let end = month
        .last_day()
        .checked_add_days(Days::new(trail.into()))
        .unwrap_or(month.last_day());

    let cells: Vec<DayCell> = start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            let key = DateKey::new(date);
            DayCell {
                date: key,
                day: date.day(),
                in_month: date.month() == month.first_day().month()
                    && date.year() == month.first_day().year(),
                marked: marked.contains(&key),
                selected: selected == Some(key),
                today: date == today,
            }
        })
        .collect();

    MonthGrid {
        title: month.title(),
        weekday_labels: weekday_labels(first_weekday),
        weeks: cells.chunks(7).map(<[DayCell]>::to_vec).collect(),
    }
}

/// Column of `day` in a week that begins on `first`.
fn days_after(day: Weekday, first: Weekday) -> u32 {
    (7 + day.num_days_from_monday() - first.num_days_from_monday()) % 7
}

fn weekday_labels(first: Weekday) -> Vec<String> {
    let mut labels = Vec::with_capacity(7);
    let mut day = first;
    for _ in 0..7 {
        labels.push(short_name(day).to_string());
        day = day.succ();
    }
    labels
}

fn short_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn year_month_navigation_wraps_years() {
        let april = YearMonth::containing(ymd(2025, 4, 17));
        assert_eq!(april.first_day(), ymd(2025, 4, 1));
        assert_eq!(april.last_day(), ymd(2025, 4, 30));
        assert_eq!(april.title(), "April 2025");

        let january = YearMonth::new(2025, 1).unwrap();
        assert_eq!(january.previous(), YearMonth::new(2024, 12).unwrap());
        assert_eq!(january.shift(13), YearMonth::new(2026, 2).unwrap());
        assert_eq!(YearMonth::new(2024, 2).unwrap().last_day(), ymd(2024, 2, 29));
    }

    #[test]
    fn grid_covers_whole_weeks_starting_monday() {
        // April 2025 starts on a Tuesday and ends on a Wednesday.
        let grid = month_grid(
            YearMonth::new(2025, 4).unwrap(),
            WeekStart::Monday,
            &BTreeSet::new(),
            None,
            ymd(2025, 4, 17),
        );
        assert_eq!(grid.weekday_labels[0], "Mon");
        assert_eq!(grid.weeks.len(), 5);
        assert!(grid.weeks.iter().all(|week| week.len() == 7));

        let first = &grid.weeks[0][0];
        assert_eq!(first.date.to_string(), "2025-03-31");
        assert!(!first.in_month);
        let last = &grid.weeks[4][6];
        assert_eq!(last.date.to_string(), "2025-05-04");

        let today: Vec<_> = grid.weeks.iter().flatten().filter(|c| c.today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].day, 17);
    }

    #[test]
    fn grid_respects_sunday_week_start() {
        let grid = month_grid(
            YearMonth::new(2025, 6).unwrap(),
            WeekStart::Sunday,
            &BTreeSet::new(),
            None,
            ymd(2000, 1, 1),
        );
        // June 1st 2025 is a Sunday, so no leading padding.
        assert_eq!(grid.weekday_labels[0], "Sun");
        assert_eq!(grid.weeks[0][0].date.to_string(), "2025-06-01");
        assert!(grid.weeks[0][0].in_month);
    }

    #[test]
    fn grid_flags_marked_and_selected_days() {
        let marked: BTreeSet<DateKey> = ["2025-04-01", "2025-04-02"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let selected = "2025-04-10".parse().ok();
        let grid = month_grid(
            YearMonth::new(2025, 4).unwrap(),
            WeekStart::Monday,
            &marked,
            selected,
            ymd(2025, 4, 17),
        );
        let cells: Vec<&DayCell> = grid.weeks.iter().flatten().collect();
        let marked_days: Vec<u32> = cells.iter().filter(|c| c.marked).map(|c| c.day).collect();
        assert_eq!(marked_days, vec![1, 2]);
        let selected_days: Vec<u32> = cells.iter().filter(|c| c.selected).map(|c| c.day).collect();
        assert_eq!(selected_days, vec![10]);
    }
}
