//! Visible-row rendering of the rollup tree under an expand/collapse state.
//!
//! Rendering is a pure function of the tree and the state. Toggling a node
//! yields a new state, after which the caller renders again from scratch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::aggregate::{Aggregation, GroupLevel, GroupNode, Totals};
use crate::format::format_currency;
use crate::record::TransactionRecord;

/// Joins path labels into a single identifier. Labels never contain it.
pub const PATH_SEPARATOR: &str = "\u{1f}";

pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

/// Labels from the type down to a node, e.g. `["Expense", "Admin", "Clerk"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, label: &str) -> Self {
        let mut labels = self.0.clone();
        labels.push(label.to_string());
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Flat identifier suitable for a DOM id or a map key.
    pub fn id(&self) -> String {
        self.0.join(PATH_SEPARATOR)
    }

    pub fn from_id(id: &str) -> Self {
        Self(id.split(PATH_SEPARATOR).map(str::to_string).collect())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

/// The set of expanded node paths. Every other node is collapsed.
///
/// State is kept per full path, so a collapsed ancestor hides but does not
/// forget the expansion of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    expanded: BTreeSet<NodePath>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, path: &NodePath) -> bool {
        self.expanded.contains(path)
    }

    /// Flips exactly one node, leaving every other path untouched.
    pub fn toggle(&self, path: &NodePath) -> Self {
        let mut expanded = self.expanded.clone();
        if !expanded.remove(path) {
            expanded.insert(path.clone());
        }
        Self { expanded }
    }

    /// Collapses every node.
    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn expanded_paths(&self) -> impl Iterator<Item = &NodePath> {
        self.expanded.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Type,
    Centre,
    Account,
    Transaction,
    GrandTotal,
}

impl From<GroupLevel> for RowKind {
    fn from(level: GroupLevel) -> Self {
        match level {
            GroupLevel::Type => RowKind::Type,
            GroupLevel::Centre => RowKind::Centre,
            GroupLevel::Account => RowKind::Account,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub kind: RowKind,
    pub depth: usize,
    /// Set on type, centre and account rows.
    pub path: Option<NodePath>,
    /// Grouping label, or the payee on transaction rows.
    pub label: String,
    pub expandable: bool,
    pub expanded: bool,
    /// Bold label and total columns.
    pub emphasis: bool,
    pub date: Option<String>,
    pub detail: Option<String>,
    pub amount: String,
    pub vat: String,
    pub total: String,
}

impl Row {
    fn figures(totals: &Totals) -> (String, String, String) {
        (
            format_currency(totals.amount),
            format_currency(totals.vat),
            format_currency(totals.total_amount),
        )
    }

    fn summary(node: &GroupNode, path: NodePath, state: &ExpansionState) -> Self {
        let expandable = match node.level {
            GroupLevel::Account => node.has_transactions(),
            GroupLevel::Type | GroupLevel::Centre => !node.children.is_empty(),
        };
        let (amount, vat, total) = Self::figures(&node.totals);
        Self {
            kind: node.level.into(),
            depth: path.depth(),
            expanded: expandable && state.is_expanded(&path),
            path: Some(path),
            label: node.name.clone(),
            expandable,
            emphasis: false,
            date: None,
            detail: None,
            amount,
            vat,
            total,
        }
    }

    fn transaction(record: &TransactionRecord, depth: usize) -> Self {
        Self {
            kind: RowKind::Transaction,
            depth,
            path: None,
            label: record.payee.clone(),
            expandable: false,
            expanded: false,
            emphasis: false,
            date: Some(record.date.clone()),
            detail: Some(record.detail.clone()),
            amount: format_currency(record.amount),
            vat: format_currency(record.vat),
            total: format_currency(record.total_amount),
        }
    }

    fn grand_total(totals: &Totals) -> Self {
        let (amount, vat, total) = Self::figures(totals);
        Self {
            kind: RowKind::GrandTotal,
            depth: 0,
            path: None,
            label: GRAND_TOTAL_LABEL.to_string(),
            expandable: false,
            expanded: false,
            emphasis: true,
            date: None,
            detail: None,
            amount,
            vat,
            total,
        }
    }
}

fn render_node(node: &GroupNode, path: NodePath, state: &ExpansionState, rows: &mut Vec<Row>) {
    let row = Row::summary(node, path.clone(), state);
    let open = row.expanded;
    rows.push(row);
    if !open {
        return;
    }

    match node.level {
        GroupLevel::Type | GroupLevel::Centre => {
            for child in node.sorted_children() {
                render_node(child, path.child(&child.name), state, rows);
            }
        }
        GroupLevel::Account => {
            let depth = path.depth() + 1;
            rows.extend(node.transactions.iter().map(|r| Row::transaction(r, depth)));
        }
    }
}

/// Visible rows for the current state, in presentation order, always ending
/// with the grand total.
pub fn render(aggregation: &Aggregation, state: &ExpansionState) -> Vec<Row> {
    let mut rows = Vec::new();
    for node in aggregation.sorted_types() {
        render_node(node, NodePath::new([node.name.as_str()]), state, &mut rows);
    }
    rows.push(Row::grand_total(&aggregation.grand_total));
    rows
}

fn row_caption(row: &Row) -> String {
    match row.kind {
        RowKind::Transaction => [
            row.date.as_deref().unwrap_or(""),
            row.label.as_str(),
            row.detail.as_deref().unwrap_or(""),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("  "),
        _ => row.label.clone(),
    }
}

/// Fixed-width text table of rendered rows for terminals and logs.
pub fn render_text(rows: &[Row]) -> String {
    let captions: Vec<String> = rows
        .iter()
        .map(|row| {
            let marker = match (row.expandable, row.expanded) {
                (true, true) => "- ",
                (true, false) => "+ ",
                (false, _) => "  ",
            };
            let caption = row_caption(row);
            let caption = if row.emphasis {
                format!("**{}**", caption)
            } else {
                caption
            };
            format!("{}{}{}", "  ".repeat(row.depth), marker, caption)
        })
        .collect();
    let width = captions
        .iter()
        .map(|c| c.chars().count())
        .chain(std::iter::once("Category".len()))
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<width$}  {:>16}  {:>14}  {:>18}\n",
        "Category",
        "Amount",
        "VAT",
        "Total",
        width = width
    ));
    for (row, caption) in rows.iter().zip(&captions) {
        let total = if row.emphasis {
            format!("**{}**", row.total)
        } else {
            row.total.clone()
        };
        output.push_str(&format!(
            "{:<width$}  {:>16}  {:>14}  {:>18}\n",
            caption,
            row.amount,
            row.vat,
            total,
            width = width
        ));
    }
    output
}
