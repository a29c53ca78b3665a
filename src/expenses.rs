//! Expense grouping, ordering and budget arithmetic.
//!
//! All amounts are summed as-is; mixing currencies within one trip is not
//! supported.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Budget, Expense, ExpenseCategory, GroupBy, SortBy};

pub const ALL_EXPENSES_LABEL: &str = "All Expenses";
pub const UNKNOWN_COUNTRY: &str = "Unknown";
pub const NEAR_BUDGET_PERCENT: f64 = 80.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpenseGroup {
    pub key: String,
    pub label: String,
    pub expenses: Vec<Expense>,
    pub subtotal: f64,
}

impl ExpenseGroup {
    fn new(key: String, label: String, expenses: Vec<Expense>) -> Self {
        let subtotal = total(&expenses);
        Self {
            key,
            label,
            expenses,
            subtotal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub budget: f64,
    pub currency: String,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub is_over_budget: bool,
    pub is_near_budget: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub total_amount: f64,
    /// Currency of the first expense, if any.
    pub currency: Option<String>,
    /// Always holds all five categories.
    pub by_category: BTreeMap<ExpenseCategory, f64>,
    pub by_day: BTreeMap<NaiveDate, f64>,
    pub by_country: BTreeMap<String, f64>,
    pub average_per_day: f64,
}

pub fn group_expenses(expenses: &[Expense], group_by: GroupBy) -> Vec<ExpenseGroup> {
    match group_by {
        GroupBy::None => vec![ExpenseGroup::new(
            "all".to_string(),
            ALL_EXPENSES_LABEL.to_string(),
            expenses.to_vec(),
        )],
        GroupBy::Day => {
            let mut by_date: BTreeMap<NaiveDate, Vec<Expense>> = BTreeMap::new();
            for expense in expenses {
                by_date.entry(expense.date).or_default().push(expense.clone());
            }
            by_date
                .into_iter()
                .rev()
                .map(|(date, items)| ExpenseGroup::new(date.to_string(), format_day_label(date), items))
                .collect()
        }
        GroupBy::Category => ExpenseCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let items: Vec<Expense> = expenses
                    .iter()
                    .filter(|expense| expense.category == category)
                    .cloned()
                    .collect();
                if items.is_empty() {
                    return None;
                }
                Some(ExpenseGroup::new(
                    category.as_str().to_string(),
                    category.label().to_string(),
                    items,
                ))
            })
            .collect(),
        GroupBy::Country => {
            let mut known: BTreeMap<String, Vec<Expense>> = BTreeMap::new();
            let mut unknown = Vec::new();
            for expense in expenses {
                match country_label(expense) {
                    Some(country) if country != UNKNOWN_COUNTRY => {
                        known.entry(country.to_string()).or_default().push(expense.clone())
                    }
                    _ => unknown.push(expense.clone()),
                }
            }
            let mut groups: Vec<ExpenseGroup> = known
                .into_iter()
                .map(|(country, items)| ExpenseGroup::new(country.clone(), country, items))
                .collect();
            if !unknown.is_empty() {
                groups.push(ExpenseGroup::new(
                    "unknown".to_string(),
                    UNKNOWN_COUNTRY.to_string(),
                    unknown,
                ));
            }
            groups
        }
    }
}

/// Stable: expenses with equal keys keep their input order.
pub fn sort_expenses(expenses: &[Expense], sort_by: SortBy) -> Vec<Expense> {
    let mut sorted = expenses.to_vec();
    match sort_by {
        SortBy::DateDesc => sorted.sort_by(|a, b| b.date.cmp(&a.date)),
        SortBy::DateAsc => sorted.sort_by(|a, b| a.date.cmp(&b.date)),
        SortBy::AmountDesc => sorted.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
        SortBy::AmountAsc => sorted.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
    }
    sorted
}

pub fn calculate_budget_status(budget: f64, expenses: &[Expense], currency: &str) -> BudgetStatus {
    let spent = total(expenses);
    let percent_used = if budget > 0.0 {
        spent / budget * 100.0
    } else {
        0.0
    };
    let is_over_budget = spent > budget;
    BudgetStatus {
        budget,
        currency: currency.to_string(),
        spent,
        remaining: budget - spent,
        percent_used,
        is_over_budget,
        is_near_budget: !is_over_budget
            && (NEAR_BUDGET_PERCENT..100.0).contains(&percent_used),
    }
}

pub fn budget_status_for(budget: &Budget, expenses: &[Expense]) -> BudgetStatus {
    calculate_budget_status(budget.amount, expenses, &budget.currency)
}

pub fn get_expense_summary(expenses: &[Expense]) -> ExpenseSummary {
    let mut by_category: BTreeMap<ExpenseCategory, f64> = ExpenseCategory::ALL
        .into_iter()
        .map(|category| (category, 0.0))
        .collect();
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut by_country: BTreeMap<String, f64> = BTreeMap::new();

    for expense in expenses {
        *by_category.entry(expense.category).or_insert(0.0) += expense.amount;
        *by_day.entry(expense.date).or_insert(0.0) += expense.amount;
        if let Some(country) = country_label(expense) {
            *by_country.entry(country.to_string()).or_insert(0.0) += expense.amount;
        }
    }

    let total_amount = total(expenses);
    let distinct_days: BTreeSet<NaiveDate> = expenses.iter().map(|expense| expense.date).collect();
    let average_per_day = if distinct_days.is_empty() {
        0.0
    } else {
        total_amount / distinct_days.len() as f64
    };

    ExpenseSummary {
        total_amount,
        currency: expenses.first().map(|expense| expense.currency.clone()),
        by_category,
        by_day,
        by_country,
        average_per_day,
    }
}

pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

fn total(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|expense| expense.amount).sum()
}

fn country_label(expense: &Expense) -> Option<&str> {
    expense
        .country
        .as_deref()
        .map(str::trim)
        .filter(|country| !country.is_empty())
}
