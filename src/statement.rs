//! Statements a reader can build without knowing the filer's role names.

/// Closed set of statements, each with the role names it is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Statement {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    Forecast,
}

const CONSOLIDATED_BALANCE_SHEET: &[&str] = &[
    "rol_ConsolidatedBalanceSheet",
    "rol_ConsolidatedStatementOfFinancialPositionIFRS",
    "rol_QuarterlyConsolidatedBalanceSheet",
    "rol_SemiAnnualConsolidatedBalanceSheet",
    "rol_BalanceSheet",
];

const BALANCE_SHEET: &[&str] = &[
    "rol_BalanceSheet",
    "rol_QuarterlyBalanceSheet",
    "rol_SemiAnnualBalanceSheet",
];

const CONSOLIDATED_INCOME_STATEMENT: &[&str] = &[
    "rol_ConsolidatedStatementOfIncome",
    "rol_ConsolidatedStatementOfComprehensiveIncomeSingleStatement",
    "rol_ConsolidatedStatementOfProfitOrLossIFRS",
    "rol_ConsolidatedStatementOfComprehensiveIncomeIFRS",
    "rol_YearToQuarterEndConsolidatedStatementOfIncome",
    "rol_QuarterlyConsolidatedStatementOfIncome",
    "rol_SemiAnnualConsolidatedStatementOfIncome",
    "rol_StatementOfIncome",
];

const INCOME_STATEMENT: &[&str] = &[
    "rol_StatementOfIncome",
    "rol_YearToQuarterEndStatementOfIncome",
    "rol_QuarterlyStatementOfIncome",
    "rol_SemiAnnualStatementOfIncome",
];

const CONSOLIDATED_CASH_FLOW: &[&str] = &[
    "rol_ConsolidatedStatementOfCashFlows-indirect",
    "rol_ConsolidatedStatementOfCashFlows-direct",
    "rol_ConsolidatedStatementOfCashFlowsIFRS",
    "rol_QuarterlyConsolidatedStatementOfCashFlows-indirect",
    "rol_SemiAnnualConsolidatedStatementOfCashFlows-indirect",
    "rol_StatementOfCashFlows-indirect",
    "rol_StatementOfCashFlows-direct",
];

const CASH_FLOW: &[&str] = &[
    "rol_StatementOfCashFlows-indirect",
    "rol_StatementOfCashFlows-direct",
    "rol_QuarterlyStatementOfCashFlows-indirect",
    "rol_SemiAnnualStatementOfCashFlows-indirect",
];

const CONSOLIDATED_FORECAST: &[&str] = &["RoleForecasts", "RoleNonConsolidatedForecasts"];

const FORECAST: &[&str] = &["RoleNonConsolidatedForecasts", "RoleForecasts"];

impl Statement {
    pub const ALL: [Statement; 4] = [
        Statement::BalanceSheet,
        Statement::IncomeStatement,
        Statement::CashFlow,
        Statement::Forecast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statement::BalanceSheet => "balance sheet",
            Statement::IncomeStatement => "income statement",
            Statement::CashFlow => "cash flow statement",
            Statement::Forecast => "forecast",
        }
    }

    /// Role names in the order they are tried. Consolidated lists fall back
    /// to the standalone statement for filers without subsidiaries.
    pub fn role_candidates(self, consolidated: bool) -> &'static [&'static str] {
        match (self, consolidated) {
            (Statement::BalanceSheet, true) => CONSOLIDATED_BALANCE_SHEET,
            (Statement::BalanceSheet, false) => BALANCE_SHEET,
            (Statement::IncomeStatement, true) => CONSOLIDATED_INCOME_STATEMENT,
            (Statement::IncomeStatement, false) => INCOME_STATEMENT,
            (Statement::CashFlow, true) => CONSOLIDATED_CASH_FLOW,
            (Statement::CashFlow, false) => CASH_FLOW,
            (Statement::Forecast, true) => CONSOLIDATED_FORECAST,
            (Statement::Forecast, false) => FORECAST,
        }
    }
}
