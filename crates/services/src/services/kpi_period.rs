//! Period arithmetic for repeating KPI goals.

use chrono::{Datelike, Days, Months, NaiveDate};
use db::models::kpi::{KpiGoal, PeriodBounds, RepeatCycle};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn bounds(start: NaiveDate, end: NaiveDate) -> PeriodBounds {
    PeriodBounds {
        start: format_date(start),
        end: format_date(end),
    }
}

/// Month arithmetic clamps to the last day of the target month
/// (Jan 31 + 1 month = Feb 28).
fn months_later_minus_a_day(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .and_then(|d| d.pred_opt())
        .unwrap_or(start)
}

fn days_later(start: NaiveDate, days: u64) -> NaiveDate {
    start.checked_add_days(Days::new(days)).unwrap_or(start)
}

/// Last day of the period beginning on `start`.
pub fn calculate_period_end(start: NaiveDate, cycle: RepeatCycle) -> NaiveDate {
    match cycle {
        RepeatCycle::Weekly | RepeatCycle::None => days_later(start, 6),
        RepeatCycle::Monthly => months_later_minus_a_day(start, 1),
        RepeatCycle::Quarterly => months_later_minus_a_day(start, 3),
        RepeatCycle::HalfYearly => months_later_minus_a_day(start, 6),
        RepeatCycle::Yearly => months_later_minus_a_day(start, 12),
    }
}

fn period_days(cycle: RepeatCycle) -> i64 {
    match cycle {
        RepeatCycle::Weekly | RepeatCycle::None => 7,
        RepeatCycle::Monthly => 30,
        RepeatCycle::Quarterly => 91,
        RepeatCycle::HalfYearly => 182,
        RepeatCycle::Yearly => 365,
    }
}

/// The period containing `today` when periods are laid end to end from
/// `start` using fixed lengths. A start in the future yields the first period.
pub fn current_period_from_start(
    start: NaiveDate,
    cycle: RepeatCycle,
    today: NaiveDate,
) -> PeriodBounds {
    let elapsed = (today - start).num_days().max(0);
    let completed = elapsed / period_days(cycle);
    let offset = u64::try_from(completed * period_days(cycle)).unwrap_or(0);
    let period_start = days_later(start, offset);
    bounds(period_start, calculate_period_end(period_start, cycle))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Calendar-aligned period containing `today`; `None` for a non-repeating goal.
pub fn current_calendar_period(cycle: RepeatCycle, today: NaiveDate) -> Option<PeriodBounds> {
    let year = today.year();
    let (start, months) = match cycle {
        RepeatCycle::None => return None,
        RepeatCycle::Weekly => {
            let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
            return Some(bounds(monday, days_later(monday, 6)));
        }
        RepeatCycle::Monthly => (first_of_month(year, today.month())?, 1),
        RepeatCycle::Quarterly => (first_of_month(year, today.month0() / 3 * 3 + 1)?, 3),
        RepeatCycle::HalfYearly => (first_of_month(year, if today.month() <= 6 { 1 } else { 7 })?, 6),
        RepeatCycle::Yearly => (first_of_month(year, 1)?, 12),
    };
    Some(bounds(start, months_later_minus_a_day(start, months)))
}

fn stored_period(goal: &KpiGoal) -> Option<PeriodBounds> {
    match (&goal.period_start, &goal.period_end) {
        (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => Some(PeriodBounds {
            start: start.clone(),
            end: end.clone(),
        }),
        _ => None,
    }
}

/// Period whose records the goal card shows: a repeating goal rolls forward
/// from its stored start, anything else uses the stored range.
pub fn display_period(goal: &KpiGoal, today: NaiveDate) -> Option<PeriodBounds> {
    let stored = stored_period(goal);
    if goal.repeat_cycle == RepeatCycle::None {
        return stored;
    }
    match goal.period_start.as_deref().and_then(parse_date) {
        Some(start) => Some(current_period_from_start(start, goal.repeat_cycle, today)),
        None => stored,
    }
}

/// Period closed by "complete period": the calendar period for repeating
/// goals, the stored range for one-off goals.
pub fn closing_period(goal: &KpiGoal, today: NaiveDate) -> Option<PeriodBounds> {
    match goal.repeat_cycle {
        RepeatCycle::None => stored_period(goal),
        cycle => current_calendar_period(cycle, today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(cycle: RepeatCycle, start: Option<&str>, end: Option<&str>) -> KpiGoal {
        KpiGoal {
            id: 1,
            project_id: 1,
            category: "sales".into(),
            title: "Calls".into(),
            target_value: 10.0,
            unit: "件".into(),
            repeat_cycle: cycle,
            period_start: start.map(String::from),
            period_end: end.map(String::from),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn display_period_rolls_repeating_goals_forward() {
        let weekly = goal(RepeatCycle::Weekly, Some("2025-01-01"), Some("2025-01-07"));
        assert_eq!(
            display_period(&weekly, d("2025-01-16")),
            Some(period("2025-01-15", "2025-01-21"))
        );

        let one_off = goal(RepeatCycle::None, Some("2025-01-01"), Some("2025-03-31"));
        assert_eq!(
            display_period(&one_off, d("2025-06-01")),
            Some(period("2025-01-01", "2025-03-31"))
        );
        assert_eq!(display_period(&goal(RepeatCycle::None, None, None), d("2025-06-01")), None);
    }

    #[test]
    fn closing_period_uses_calendar_or_stored_range() {
        let monthly = goal(RepeatCycle::Monthly, Some("2025-01-10"), Some("2025-02-09"));
        assert_eq!(
            closing_period(&monthly, d("2025-05-20")),
            Some(period("2025-05-01", "2025-05-31"))
        );
        let one_off = goal(RepeatCycle::None, Some("2025-01-01"), Some("2025-03-31"));
        assert_eq!(
            closing_period(&one_off, d("2025-05-20")),
            Some(period("2025-01-01", "2025-03-31"))
        );
        assert_eq!(closing_period(&goal(RepeatCycle::None, None, None), d("2025-05-20")), None);
    }

    fn d(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn period(start: &str, end: &str) -> PeriodBounds {
        PeriodBounds {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    #[test]
    fn period_end_per_cycle() {
        let start = d("2025-01-15");
        assert_eq!(calculate_period_end(start, RepeatCycle::Weekly), d("2025-01-21"));
        assert_eq!(calculate_period_end(start, RepeatCycle::None), d("2025-01-21"));
        assert_eq!(calculate_period_end(start, RepeatCycle::Monthly), d("2025-02-14"));
        assert_eq!(calculate_period_end(start, RepeatCycle::Quarterly), d("2025-04-14"));
        assert_eq!(calculate_period_end(start, RepeatCycle::HalfYearly), d("2025-07-14"));
        assert_eq!(calculate_period_end(start, RepeatCycle::Yearly), d("2026-01-14"));
    }

    #[test]
    fn month_end_start_clamps() {
        assert_eq!(calculate_period_end(d("2025-01-31"), RepeatCycle::Monthly), d("2025-02-27"));
    }

    #[test]
    fn period_from_start_advances_whole_periods() {
        assert_eq!(
            current_period_from_start(d("2025-01-01"), RepeatCycle::Weekly, d("2025-01-16")),
            period("2025-01-15", "2025-01-21")
        );
        assert_eq!(
            current_period_from_start(d("2025-01-01"), RepeatCycle::Monthly, d("2025-03-05")),
            period("2025-03-02", "2025-04-01")
        );
        assert_eq!(
            current_period_from_start(d("2025-06-01"), RepeatCycle::Weekly, d("2025-05-01")),
            period("2025-06-01", "2025-06-07")
        );
    }

    #[test]
    fn calendar_periods() {
        // 2025-08-14 is a Thursday.
        let today = d("2025-08-14");
        assert_eq!(
            current_calendar_period(RepeatCycle::Weekly, today),
            Some(period("2025-08-11", "2025-08-17"))
        );
        assert_eq!(
            current_calendar_period(RepeatCycle::Monthly, today),
            Some(period("2025-08-01", "2025-08-31"))
        );
        assert_eq!(
            current_calendar_period(RepeatCycle::Quarterly, today),
            Some(period("2025-07-01", "2025-09-30"))
        );
        assert_eq!(
            current_calendar_period(RepeatCycle::HalfYearly, today),
            Some(period("2025-07-01", "2025-12-31"))
        );
        assert_eq!(
            current_calendar_period(RepeatCycle::Yearly, today),
            Some(period("2025-01-01", "2025-12-31"))
        );
        assert_eq!(current_calendar_period(RepeatCycle::None, today), None);
    }

    #[test]
    fn sunday_belongs_to_the_preceding_week() {
        assert_eq!(
            current_calendar_period(RepeatCycle::Weekly, d("2025-08-17")),
            Some(period("2025-08-11", "2025-08-17"))
        );
        assert_eq!(
            current_calendar_period(RepeatCycle::Monthly, d("2024-02-10")),
            Some(period("2024-02-01", "2024-02-29"))
        );
    }
}
