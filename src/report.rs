//! Terminal output: colored tables for the account, portfolio, quote, option chain and order.
//! Takes plain domain values; no decision logic lives here.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;

use crate::error::WheelError;
use crate::occ::OccParts;
use crate::strategy::CONTRACT_MULTIPLIER;
use crate::types::{
    Account, ContractType, LimitOrderRequest, OptionContract, Position, PositionSide, Quote,
    StrikeBound,
};

/// A rendered cell: display text (may carry ANSI codes) and its visible width.
struct Cell {
    text: String,
    width: usize,
}

impl Cell {
    fn plain(s: impl Into<String>) -> Self {
        let text = s.into();
        let width = text.chars().count();
        Self { text, width }
    }

    fn styled(s: ColoredString) -> Self {
        let width = s.chars().count();
        Self {
            text: s.to_string(),
            width,
        }
    }
}

struct Table {
    title: Option<String>,
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    fn new(title: Option<&str>, headers: &[&'static str]) -> Self {
        Self {
            title: title.map(str::to_string),
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, c) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(c.width);
                }
            }
        }
        let sep = widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("┼");

        let mut out = String::new();
        if let Some(t) = &self.title {
            out.push_str(&format!("{}\n", t.bold()));
        }
        let header = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!(" {:<w$} ", h, w = w))
            .collect::<Vec<_>>()
            .join("│");
        out.push_str(&format!("{}\n{}\n", header, sep));
        for row in &self.rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!(" {}{} ", c.text, " ".repeat(w.saturating_sub(c.width))))
                .collect::<Vec<_>>()
                .join("│");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

// ---------- Coloring ----------

pub fn green_or_red(v: Decimal) -> ColoredString {
    let s = fmt_num(v);
    if v > Decimal::ZERO {
        s.green()
    } else {
        s.red()
    }
}

pub fn long_or_short(side: PositionSide) -> ColoredString {
    let s = side.as_str();
    match side {
        PositionSide::Long => s.green(),
        PositionSide::Short => s.red(),
    }
}

/// OCC symbols colored per component; anything else (equities) in cyan.
pub fn option_symbol(s: &str) -> String {
    let Some(p) = OccParts::split(s) else {
        return s.cyan().to_string();
    };
    let right = if p.right == "P" { p.right.red() } else { p.right.green() };
    [
        p.root.cyan(),
        p.date.yellow(),
        right,
        p.zeros.bright_black(),
        p.dollars.blue(),
        p.cents.white(),
        p.mills.bright_black(),
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

/// Whole numbers without decimals, everything else to cents.
fn fmt_num(v: Decimal) -> String {
    if v.fract().is_zero() {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn symbol_cell(s: &str) -> Cell {
    Cell {
        text: option_symbol(s),
        width: s.chars().count(),
    }
}

// ---------- Tables ----------

pub fn banner() -> String {
    "Welcome to Alpaca-Wheel!\n========================\n".to_string()
}

pub fn account_overview(account: &Account, paper: bool) -> String {
    let mut t = Table::new(Some("Account Overview"), &["Cash", "Todays P/L", "Paper"]);
    t.add_row(vec![
        Cell::styled(green_or_red(account.cash)),
        Cell::styled(green_or_red(account.balance_change())),
        Cell::plain(paper.to_string()),
    ]);
    t.render()
}

pub fn positions(portfolio: &[Position]) -> String {
    let mut t = Table::new(
        Some("Portfolio"),
        &["Quantity", "Available", "Symbol", "Type", "Long/Short", "P/L"],
    );
    for p in portfolio {
        t.add_row(vec![
            Cell::styled(green_or_red(p.qty)),
            Cell::styled(green_or_red(p.qty_available)),
            symbol_cell(&p.symbol),
            Cell::plain(p.asset_class.as_str()),
            Cell::styled(long_or_short(p.side)),
            Cell::styled(green_or_red(p.unrealized_pl)),
        ]);
    }
    t.render()
}

pub fn position_detail(p: &Position) -> String {
    let title = format!("{} Position (detailed)", p.symbol);
    format!(
        "\n{}\n{}\n{} {} @ {:.2} [{}]\n",
        title,
        "=".repeat(title.len()),
        fmt_num(p.qty_available),
        option_symbol(&p.symbol),
        p.avg_entry_price,
        green_or_red(p.unrealized_pl)
    )
}

pub fn bid_ask(symbol: &str, quote: &Quote, bound: Option<&StrikeBound>) -> String {
    let mut t = Table::new(None, &["symbol", "bid", "ask", "Desired Strike"]);
    t.add_row(vec![
        symbol_cell(symbol),
        Cell::plain(format!("{}", quote.bid_price)),
        Cell::plain(format!("{}", quote.ask_price)),
        Cell::plain(bound.map(|b| b.to_string()).unwrap_or_default()),
    ]);
    t.render()
}

pub fn option_chain(contracts: &[&OptionContract]) -> String {
    let mut t = Table::new(
        Some("Option Chain"),
        &["bid", "symbol", "delta", "gamma", "rho", "theta", "vega", "iv"],
    );
    for c in contracts {
        let mut row = vec![
            Cell::plain(c.bid().map(|b| format!("{:.2}", b)).unwrap_or_default()),
            symbol_cell(&c.symbol),
        ];
        match c.greeks {
            Some(g) => {
                for v in [g.delta, g.gamma, g.rho, g.theta, g.vega] {
                    row.push(Cell::plain(format!("{:.4}", v)));
                }
            }
            None => row.extend((0..5).map(|_| Cell::plain(" "))),
        }
        row.push(Cell::plain(
            c.implied_volatility
                .map(|iv| format!("{:.4}", iv))
                .unwrap_or_default(),
        ));
        t.add_row(row);
    }
    t.render()
}

pub fn mode(mode: ContractType) -> String {
    format!("current Mode: {}", mode.as_str().bold())
}

pub fn order(order: &LimitOrderRequest) -> String {
    format!(
        "executing [SELL {}] for >${:.2}\n{:?}",
        option_symbol(&order.symbol),
        order.limit_price * CONTRACT_MULTIPLIER,
        order
    )
}

/// Why a run stopped, in the terms a user can act on.
pub fn failure(err: &WheelError) -> String {
    match err {
        WheelError::ShortPositionOpen { positions, .. } => {
            let list = positions
                .iter()
                .map(|s| format!("[FAIL] you have an open short position! [{}]", option_symbol(s)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n[FAIL] Exiting!!!!", list)
        }
        WheelError::NotTradable { symbol } => format!("[{}] NOT TRADEABLE! [[ERROR]]", symbol),
        WheelError::NoCandidates => [
            "No acceptable contracts found!",
            "this can be for any number of reasons including:",
            "  - bad expiration date",
            "  - unable to fetch greeks",
            "  - no contracts under the delta threshold",
        ]
        .join("\n"),
        other => format!("[FAIL] {}", other),
    }
}
