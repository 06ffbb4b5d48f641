//! Type → Centre → Account rollup of a period's cashbook lines.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use crate::record::TransactionRecord;

/// Type label that always heads the table.
pub const INCOME_TYPE: &str = "Income";
pub const EXPENSE_TYPE: &str = "Expense";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub amount: f64,
    pub vat: f64,
    pub total_amount: f64,
}

impl Totals {
    pub fn of_record(record: &TransactionRecord) -> Self {
        Self {
            amount: record.amount,
            vat: record.vat,
            total_amount: record.total_amount,
        }
    }

    pub fn approx_eq(&self, other: &Totals, tolerance: f64) -> bool {
        (self.amount - other.amount).abs() <= tolerance
            && (self.vat - other.vat).abs() <= tolerance
            && (self.total_amount - other.total_amount).abs() <= tolerance
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            amount: self.amount + rhs.amount,
            vat: self.vat + rhs.vat,
            total_amount: self.total_amount + rhs.total_amount,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Totals) {
        *self = *self + rhs;
    }
}

impl<'a> std::iter::Sum<&'a TransactionRecord> for Totals {
    fn sum<I: Iterator<Item = &'a TransactionRecord>>(iter: I) -> Totals {
        iter.fold(Totals::default(), |acc, r| acc + Totals::of_record(r))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupLevel {
    Type,
    Centre,
    Account,
}

/// A node of the rollup tree. Type and Centre nodes carry `children`; Account
/// nodes carry the raw `transactions` and never have children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub name: String,
    pub level: GroupLevel,
    pub totals: Totals,
    pub children: BTreeMap<String, GroupNode>,
    pub transactions: Vec<TransactionRecord>,
}

impl GroupNode {
    fn new(name: &str, level: GroupLevel) -> Self {
        Self {
            name: name.to_string(),
            level,
            totals: Totals::default(),
            children: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    fn child_mut(&mut self, name: &str, level: GroupLevel) -> &mut GroupNode {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| GroupNode::new(name, level))
    }

    /// Children in presentation order (lexicographic by label).
    pub fn sorted_children(&self) -> impl Iterator<Item = &GroupNode> {
        self.children.values()
    }

    pub fn has_transactions(&self) -> bool {
        !self.transactions.is_empty()
    }

    /// Totals recomputed from the node's direct contents.
    pub fn recomputed_totals(&self) -> Totals {
        match self.level {
            GroupLevel::Account => self.transactions.iter().sum(),
            GroupLevel::Type | GroupLevel::Centre => self
                .children
                .values()
                .fold(Totals::default(), |acc, child| acc + child.totals),
        }
    }

    /// True when this node and every descendant agree with their contents.
    pub fn check_rollup(&self, tolerance: f64) -> bool {
        self.totals
            .approx_eq(&self.recomputed_totals(), tolerance)
            && self.children.values().all(|c| c.check_rollup(tolerance))
    }
}

/// Type labels in presentation order: `Income` first, the rest
/// lexicographically.
pub fn compare_type_labels(a: &str, b: &str) -> Ordering {
    match (a == INCOME_TYPE, b == INCOME_TYPE) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub types: BTreeMap<String, GroupNode>,
    /// Summed straight from the records, not from the tree.
    pub grand_total: Totals,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn sorted_types(&self) -> Vec<&GroupNode> {
        let mut types: Vec<&GroupNode> = self.types.values().collect();
        types.sort_by(|a, b| compare_type_labels(&a.name, &b.name));
        types
    }

    /// Looks a node up by its label path (type, then centre, then account).
    pub fn node(&self, path: &[String]) -> Option<&GroupNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.types.get(first)?, |node, label| node.children.get(label))
    }

    pub fn check_rollup(&self, tolerance: f64) -> bool {
        let from_tree = self
            .types
            .values()
            .fold(Totals::default(), |acc, node| acc + node.totals);
        from_tree.approx_eq(&self.grand_total, tolerance)
            && self.types.values().all(|t| t.check_rollup(tolerance))
    }
}

/// Groups records into the rollup tree in a single pass. Each record's
/// figures are added at the account, centre and type levels as it is placed.
pub fn aggregate(records: &[TransactionRecord]) -> Aggregation {
    let mut types: BTreeMap<String, GroupNode> = BTreeMap::new();
    let mut grand_total = Totals::default();

    for record in records {
        let figures = Totals::of_record(record);
        grand_total += figures;

        let type_label = record.type_label();
        let type_node = types
            .entry(type_label.to_string())
            .or_insert_with(|| GroupNode::new(type_label, GroupLevel::Type));
        type_node.totals += figures;

        let centre_node = type_node.child_mut(record.centre_label(), GroupLevel::Centre);
        centre_node.totals += figures;

        let account_node = centre_node.child_mut(record.account_label(), GroupLevel::Account);
        account_node.totals += figures;
        account_node.transactions.push(record.clone());
    }

    Aggregation { types, grand_total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, centre: &str, account: &str, amount: f64, vat: f64) -> TransactionRecord {
        TransactionRecord {
            record_type: kind.to_string(),
            centre_name: centre.to_string(),
            account_name: account.to_string(),
            amount,
            vat,
            total_amount: amount + vat,
            ..Default::default()
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            record("Expense", "Open Spaces", "Grass Cutting", -400.0, -80.0),
            record("Income", "Admin", "Precept", 12000.0, 0.0),
            record("Expense", "Admin", "Clerk Salary", -900.0, 0.0),
            record("Expense", "Open Spaces", "Grass Cutting", -250.5, -50.1),
            record("Balance", "Bank", "Transfer", 10.0, 0.0),
            record("Income", "Admin", "Bank Interest", 3.27, 0.0),
        ]
    }

    #[test]
    fn test_rollup_invariant_holds() {
        let agg = aggregate(&sample());
        assert!(agg.check_rollup(1e-9));

        let grass = agg
            .node(&[
                "Expense".to_string(),
                "Open Spaces".to_string(),
                "Grass Cutting".to_string(),
            ])
            .unwrap();
        assert_eq!(grass.transactions.len(), 2);
        assert!((grass.totals.amount - -650.5).abs() < 1e-9);
        assert!((grass.totals.vat - -130.1).abs() < 1e-9);
    }

    #[test]
    fn test_grand_total_agrees_with_tree() {
        let records = sample();
        let agg = aggregate(&records);
        let direct: Totals = records.iter().sum();
        assert!(agg.grand_total.approx_eq(&direct, 1e-9));

        let from_types = agg
            .types
            .values()
            .fold(Totals::default(), |acc, t| acc + t.totals);
        assert!(from_types.approx_eq(&agg.grand_total, 1e-9));
    }

    #[test]
    fn test_income_sorts_first() {
        let agg = aggregate(&sample());
        let names: Vec<&str> = agg.sorted_types().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Income", "Balance", "Expense"]);
    }

    #[test]
    fn test_type_order_ignores_input_order() {
        let mut reversed = sample();
        reversed.reverse();

        let mut income_last: Vec<TransactionRecord> = sample()
            .into_iter()
            .filter(|r| r.record_type != INCOME_TYPE)
            .collect();
        income_last.extend(sample().into_iter().filter(|r| r.record_type == INCOME_TYPE));

        for records in [sample(), reversed, income_last] {
            let agg = aggregate(&records);
            let names: Vec<&str> = agg.sorted_types().iter().map(|n| n.name.as_str()).collect();
            assert_eq!(names, vec!["Income", "Balance", "Expense"]);

            let accounts: Vec<&str> = agg.types["Income"].children["Admin"]
                .sorted_children()
                .map(|n| n.name.as_str())
                .collect();
            assert_eq!(accounts, vec!["Bank Interest", "Precept"]);
        }
    }

    #[test]
    fn test_children_are_lexicographic() {
        let agg = aggregate(&sample());
        let expense = &agg.types["Expense"];
        let centres: Vec<&str> = expense.sorted_children().map(|n| n.name.as_str()).collect();
        assert_eq!(centres, vec!["Admin", "Open Spaces"]);

        let income_admin = &agg.types["Income"].children["Admin"];
        let accounts: Vec<&str> = income_admin
            .sorted_children()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(accounts, vec!["Bank Interest", "Precept"]);
    }

    #[test]
    fn test_missing_labels_group_as_unknown() {
        let agg = aggregate(&[record("", "", "", 5.0, 1.0)]);
        let node = agg
            .node(&[
                "Unknown".to_string(),
                "Unknown".to_string(),
                "Unknown".to_string(),
            ])
            .unwrap();
        assert_eq!(node.level, GroupLevel::Account);
        assert_eq!(node.transactions.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let agg = aggregate(&[]);
        assert!(agg.is_empty());
        assert_eq!(agg.grand_total, Totals::default());
        assert!(agg.sorted_types().is_empty());
        assert!(agg.check_rollup(0.0));
    }

    #[test]
    fn test_zero_amount_records_still_counted() {
        let agg = aggregate(&[record("Expense", "Admin", "Stationery", 0.0, 0.0)]);
        let node = &agg.types["Expense"].children["Admin"].children["Stationery"];
        assert_eq!(node.transactions.len(), 1);
    }
}
