use crate::expenses::{format_day_label, BudgetStatus, ExpenseGroup, ExpenseSummary};
use crate::model::{DayPlan, DayStatus, Expense, TripPlan};
use crate::progress::TripStats;

fn has_text(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

pub fn format_km(km: f64) -> String {
    format!("{km:.1}")
}

pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

pub fn format_day_line(position: usize, day: &DayPlan) -> String {
    let mut line = format!(
        "{position}. {} [{}] km {}-{} ({} km",
        day.date.format("%Y-%m-%d"),
        day.status.as_str(),
        format_km(day.start_km),
        format_km(day.end_km()),
        format_km(day.target_km)
    );
    if let Some(actual) = day.actual_km {
        line.push_str(&format!(", ridden {}", format_km(actual)));
    }
    line.push(')');
    if day.is_rest_day() {
        line.push_str(" rest");
    }
    line
}

pub fn format_trip_detail(trip: &TripPlan) -> String {
    let mut output = String::new();
    output.push_str(&format!("Trip ID: {}\n", trip.id));
    output.push_str(&format!("Name: {}\n", trip.name));
    output.push_str(&format!("Status: {}\n", trip.status.as_str()));
    output.push_str(&format!("Route: {}\n", trip.route_source));
    output.push_str(&format!(
        "Distance: {} km ({} km/day)\n",
        format_km(trip.total_distance_km),
        format_km(trip.daily_distance_km)
    ));
    if let Some(budget) = &trip.budget {
        output.push_str(&format!(
            "Budget: {}\n",
            format_amount(budget.amount, &budget.currency)
        ));
    }
    output.push('\n');
    if trip.days.is_empty() {
        output.push_str("Days: (none)");
        return output;
    }
    output.push_str("Days:\n");
    for (idx, day) in trip.days.iter().enumerate() {
        output.push_str(&format!("{}\n", format_day_line(idx + 1, day)));
        if has_text(&day.notes) {
            output.push_str(&format!(
                "   Note: {}\n",
                day.notes.as_deref().unwrap_or("")
            ));
        }
    }
    output.trim_end().to_string()
}

pub fn format_trip_stats(
    trip: &TripPlan,
    stats: &TripStats,
    next_day: Option<(usize, &DayPlan)>,
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Trip ID: {}\n", trip.id));
    output.push_str(&format!(
        "Progress: {:.1}% ({} of {} km)\n",
        stats.progress_percent,
        format_km(stats.completed_km),
        format_km(stats.total_distance_km)
    ));
    output.push_str(&format!("Remaining: {} km\n", format_km(stats.remaining_km)));
    output.push_str(&format!(
        "Days: {} total, {} completed, {} remaining, {} rest\n",
        stats.total_days, stats.completed_days, stats.remaining_days, stats.rest_days
    ));
    match next_day {
        Some((position, day)) => output.push_str(&format!(
            "Next: {}",
            format_day_line(position, day)
        )),
        None => output.push_str("Next: (none)"),
    }
    output
}

/// Looks up the 1-based position of the day an expense is attached to.
fn day_position(trip: &TripPlan, expense: &Expense) -> Option<usize> {
    expense
        .day_plan_id
        .and_then(|id| trip.day_index(id))
        .map(|idx| idx + 1)
}

pub fn format_expense_line(trip: &TripPlan, expense: &Expense) -> String {
    let mut line = format!(
        "#{} {} {} [{}]",
        expense.id,
        expense.date.format("%Y-%m-%d"),
        format_amount(expense.amount, &expense.currency),
        expense.category.as_str()
    );
    if let Some(position) = day_position(trip, expense) {
        line.push_str(&format!(" day {position}"));
    }
    if let Some(country) = expense.country.as_deref() {
        line.push_str(&format!(" ({country})"));
    }
    if let Some(description) = expense.description.as_deref() {
        line.push_str(&format!(" {description}"));
    }
    line
}

pub fn format_expense_groups(trip: &TripPlan, groups: &[ExpenseGroup]) -> String {
    let currency = currency_of(trip, groups.iter().flat_map(|group| &group.expenses));
    let mut lines = Vec::new();
    for group in groups {
        lines.push(format!(
            "{} ({}, {} item(s))",
            group.label,
            format_amount(group.subtotal, &currency),
            group.expenses.len()
        ));
        for expense in &group.expenses {
            lines.push(format!("  {}", format_expense_line(trip, expense)));
        }
    }
    if lines.is_empty() {
        return "No expenses.".to_string();
    }
    lines.join("\n")
}

pub fn format_expense_summary(trip: &TripPlan, summary: &ExpenseSummary) -> String {
    let currency = summary
        .currency
        .clone()
        .unwrap_or_else(|| currency_of(trip, std::iter::empty()));
    let mut output = String::new();
    output.push_str(&format!(
        "Total: {}\n",
        format_amount(summary.total_amount, &currency)
    ));
    output.push_str(&format!(
        "Average per day: {}\n",
        format_amount(summary.average_per_day, &currency)
    ));
    output.push_str("By category:\n");
    for (category, amount) in &summary.by_category {
        output.push_str(&format!(
            "- {}: {}\n",
            category.label(),
            format_amount(*amount, &currency)
        ));
    }
    if !summary.by_country.is_empty() {
        output.push_str("By country:\n");
        for (country, amount) in &summary.by_country {
            output.push_str(&format!("- {country}: {}\n", format_amount(*amount, &currency)));
        }
    }
    if !summary.by_day.is_empty() {
        output.push_str("By day:\n");
        for (date, amount) in summary.by_day.iter().rev() {
            output.push_str(&format!(
                "- {}: {}\n",
                format_day_label(*date),
                format_amount(*amount, &currency)
            ));
        }
    }
    output.trim_end().to_string()
}

pub fn format_budget_status(status: &BudgetStatus) -> String {
    let state = if status.is_over_budget {
        "over budget"
    } else if status.is_near_budget {
        "near budget"
    } else {
        "within budget"
    };
    let mut output = String::new();
    output.push_str(&format!(
        "Budget: {}\n",
        format_amount(status.budget, &status.currency)
    ));
    output.push_str(&format!(
        "Spent: {} ({:.1}%)\n",
        format_amount(status.spent, &status.currency),
        status.percent_used
    ));
    output.push_str(&format!(
        "Remaining: {}\n",
        format_amount(status.remaining, &status.currency)
    ));
    output.push_str(&format!("Status: {state}"));
    output
}

/// Checklist export of a trip's schedule.
pub fn format_trip_markdown(trip: &TripPlan, stats: &TripStats) -> String {
    fn checkbox(status: DayStatus) -> &'static str {
        match status {
            DayStatus::Completed => "x",
            DayStatus::Skipped => "-",
            DayStatus::Planned | DayStatus::InProgress => " ",
        }
    }

    let mut lines = Vec::new();
    lines.push(format!("# {}", trip.name.trim()));
    lines.push(String::new());
    lines.push(format!("- **Trip ID:** `{}`", trip.id));
    lines.push(format!("- **Status:** `{}`", trip.status.as_str()));
    lines.push(format!("- **Route:** {}", trip.route_source));
    lines.push(format!(
        "- **Progress:** {} / {} km ({:.1}%)",
        format_km(stats.completed_km),
        format_km(stats.total_distance_km),
        stats.progress_percent
    ));
    if let Some(budget) = &trip.budget {
        lines.push(format!(
            "- **Budget:** {}",
            format_amount(budget.amount, &budget.currency)
        ));
    }
    lines.push(String::new());
    lines.push("## Days".to_string());
    lines.push(String::new());
    if trip.days.is_empty() {
        lines.push("*No days*".to_string());
        return lines.join("\n");
    }
    for (idx, day) in trip.days.iter().enumerate() {
        let label = if day.is_rest_day() {
            "rest day".to_string()
        } else {
            format!(
                "km {} to {}",
                format_km(day.start_km),
                format_km(day.end_km())
            )
        };
        lines.push(format!(
            "- [{}] **Day {}** {}: {}",
            checkbox(day.status),
            idx + 1,
            day.date.format("%Y-%m-%d"),
            label
        ));
        if let Some(actual) = day.actual_km {
            lines.push(format!("  - Ridden: {} km", format_km(actual)));
        }
        if has_text(&day.notes) {
            lines.push(format!("  - Note: {}", day.notes.as_deref().unwrap_or("")));
        }
    }
    lines.join("\n")
}

fn currency_of<'a>(trip: &TripPlan, mut expenses: impl Iterator<Item = &'a Expense>) -> String {
    expenses
        .next()
        .map(|expense| expense.currency.clone())
        .or_else(|| trip.budget.as_ref().map(|budget| budget.currency.clone()))
        .unwrap_or_else(|| crate::model::DEFAULT_CURRENCY.to_string())
}
