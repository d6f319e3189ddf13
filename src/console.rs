//! Interactive text menu over the query router and the write path.

use crate::db::{BatchWriter, Session};
use crate::domain::{Account, Symbol, TradeType, Username};
use crate::error::AppError;
use crate::generator::Generator;
use crate::query::{AccessPattern, QueryRouter, TradeFilter};
use chrono::{NaiveDate, Utc};
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuOption {
    Populate,
    ShowAccounts,
    ShowPositions,
    TradeHistory,
    ChangeUsername,
    Exit,
}

impl MenuOption {
    const ALL: [MenuOption; 6] = [
        MenuOption::Populate,
        MenuOption::ShowAccounts,
        MenuOption::ShowPositions,
        MenuOption::TradeHistory,
        MenuOption::ChangeUsername,
        MenuOption::Exit,
    ];

    fn label(&self) -> &'static str {
        match self {
            MenuOption::Populate => "Populate data",
            MenuOption::ShowAccounts => "Show accounts",
            MenuOption::ShowPositions => "Show positions",
            MenuOption::TradeHistory => "Show trade history",
            MenuOption::ChangeUsername => "Change username",
            MenuOption::Exit => "Exit",
        }
    }

    fn from_choice(choice: &str) -> Option<Self> {
        let index = choice.trim().parse::<usize>().ok()?;
        Self::ALL.get(index).copied()
    }
}

/// Menu loop reading commands from `input` and rendering to `output`.
///
/// Query and write failures are printed and the loop continues; only I/O
/// errors end it early. End of input exits like option 5.
pub struct Console<'a, S: Session, R, W> {
    router: QueryRouter<'a, S>,
    writer: BatchWriter<'a, S>,
    generator: Generator,
    input: R,
    output: W,
    username: Username,
    eof: bool,
}

impl<'a, S: Session, R: BufRead, W: Write> Console<'a, S, R, W> {
    pub fn new(
        router: QueryRouter<'a, S>,
        writer: BatchWriter<'a, S>,
        generator: Generator,
        input: R,
        output: W,
    ) -> Self {
        Console {
            router,
            writer,
            generator,
            input,
            output,
            username: Username::new(""),
            eof: false,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self) -> Result<(), AppError> {
        self.set_username()?;
        while !self.eof {
            self.print_menu()?;
            let choice = self.prompt("Enter your choice: ")?;
            if self.eof {
                break;
            }
            let Some(option) = MenuOption::from_choice(&choice) else {
                writeln!(self.output, "Invalid option: {:?}", choice.trim())?;
                continue;
            };
            if option == MenuOption::Exit {
                break;
            }
            match self.dispatch(option).await {
                Ok(()) => {}
                Err(AppError::Io(e)) => return Err(AppError::Io(e)),
                Err(e) => {
                    warn!("{:?} failed: {}", option, e);
                    writeln!(self.output, "Error: {}", e)?;
                }
            }
        }
        info!("Console closed");
        Ok(())
    }

    async fn dispatch(&mut self, option: MenuOption) -> Result<(), AppError> {
        match option {
            MenuOption::Populate => self.populate().await,
            MenuOption::ShowAccounts => self.show_accounts().await,
            MenuOption::ShowPositions => self.show_positions().await,
            MenuOption::TradeHistory => self.show_trade_history().await,
            MenuOption::ChangeUsername => self.set_username(),
            MenuOption::Exit => Ok(()),
        }
    }

    fn print_menu(&mut self) -> Result<(), AppError> {
        writeln!(self.output)?;
        for (i, option) in MenuOption::ALL.iter().enumerate() {
            writeln!(self.output, "{} -- {}", i, option.label())?;
        }
        Ok(())
    }

    /// Read one trimmed line; empty at end of input.
    fn prompt(&mut self, message: &str) -> Result<String, AppError> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.eof = true;
        }
        Ok(line.trim().to_string())
    }

    fn set_username(&mut self) -> Result<(), AppError> {
        let username = self.prompt("**** Username to use app: ")?;
        self.username = Username::new(username);
        info!("Username set to {}", self.username);
        Ok(())
    }

    async fn populate(&mut self) -> Result<(), AppError> {
        let dataset = self.generator.generate()?;
        let summary = self.writer.populate(&dataset).await?;
        writeln!(
            self.output,
            "Populated {} accounts, {} positions and {} trades ({} batches).",
            summary.accounts, summary.positions, summary.trades, summary.batches
        )?;
        Ok(())
    }

    async fn show_accounts(&mut self) -> Result<(), AppError> {
        let accounts = self.router.list_accounts(&self.username).await?;
        if accounts.is_empty() {
            writeln!(self.output, "No accounts for {}.", self.username)?;
            return Ok(());
        }
        let rows: Vec<Vec<String>> = accounts
            .iter()
            .map(|a| {
                vec![
                    a.account_number.to_string(),
                    a.name.clone(),
                    a.cash_balance.to_string(),
                ]
            })
            .collect();
        render_table(
            &mut self.output,
            &["Account Number", "Name", "Cash Balance"],
            &rows,
        )?;
        Ok(())
    }

    async fn show_positions(&mut self) -> Result<(), AppError> {
        let Some(account) = self.pick_account().await? else {
            return Ok(());
        };
        let positions = self.router.list_positions(&account.account_number).await?;
        if positions.is_empty() {
            writeln!(self.output, "No positions for {}.", account.account_number)?;
            return Ok(());
        }
        let rows: Vec<Vec<String>> = positions
            .iter()
            .map(|p| vec![p.symbol.to_string(), p.quantity.to_string()])
            .collect();
        render_table(&mut self.output, &["Symbol", "Quantity"], &rows)?;
        Ok(())
    }

    async fn show_trade_history(&mut self) -> Result<(), AppError> {
        for (i, pattern) in AccessPattern::TRADES.iter().enumerate() {
            writeln!(self.output, "    {} -- {}", i + 1, pattern.label())?;
        }
        let choice = self.prompt("Enter your trade view choice: ")?;
        let pattern = match choice.parse::<usize>() {
            Ok(n) if (1..=AccessPattern::TRADES.len()).contains(&n) => AccessPattern::TRADES[n - 1],
            _ => {
                writeln!(self.output, "Invalid trade view: {:?}", choice)?;
                return Ok(());
            }
        };

        let Some(account) = self.pick_account().await? else {
            return Ok(());
        };
        let mut filter = TradeFilter::for_account(account.account_number);

        if pattern.needs_type() {
            let answer = self.prompt("Enter trade type (buy or sell): ")?;
            match answer.parse::<TradeType>() {
                Ok(trade_type) => filter = filter.with_type(trade_type),
                Err(e) => {
                    writeln!(self.output, "{}", e)?;
                    return Ok(());
                }
            }
        }
        if pattern.needs_symbol() {
            let symbols: Vec<&str> = self.router.instruments().iter().map(|s| s.as_str()).collect();
            writeln!(self.output, "Symbols: {}", symbols.join(", "))?;
            let answer = self.prompt("Enter instrument symbol (eg. VOO): ")?;
            let symbol = Symbol::new(answer.to_uppercase());
            if !self.router.has_instrument(&symbol) {
                writeln!(self.output, "Unknown symbol: {:?}", symbol.as_str())?;
                return Ok(());
            }
            filter = filter.with_symbol(symbol);
        }

        let start = self.prompt("Start date (YYYY-MM-DD, blank for latest trades): ")?;
        if !start.is_empty() {
            let Some(start) = self.parse_date(&start)? else {
                return Ok(());
            };
            let end = self.prompt("End date (YYYY-MM-DD, blank for today): ")?;
            let end = if end.is_empty() {
                Utc::now().date_naive()
            } else {
                match self.parse_date(&end)? {
                    Some(end) => end,
                    None => return Ok(()),
                }
            };
            filter = filter.between(start, end);
        }

        let trades = self.router.list_trades_as(pattern, &filter).await?;
        if trades.is_empty() {
            writeln!(self.output, "No trades found.")?;
            return Ok(());
        }
        let rows: Vec<Vec<String>> = trades
            .iter()
            .map(|t| {
                vec![
                    t.trade_date().to_string(),
                    t.trade_type.to_string(),
                    t.symbol.to_string(),
                    t.shares.to_string(),
                    t.price.to_string(),
                    t.amount.to_string(),
                    t.trade_id.to_string(),
                ]
            })
            .collect();
        render_table(
            &mut self.output,
            &["Date", "Type", "Symbol", "Shares", "Price", "Amount", "Trade Id"],
            &rows,
        )?;
        Ok(())
    }

    fn parse_date(&mut self, text: &str) -> Result<Option<NaiveDate>, AppError> {
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => Ok(Some(date)),
            Err(_) => {
                writeln!(self.output, "Invalid date: {:?}", text)?;
                Ok(None)
            }
        }
    }

    async fn pick_account(&mut self) -> Result<Option<Account>, AppError> {
        let mut accounts = self.router.list_accounts(&self.username).await?;
        if accounts.is_empty() {
            writeln!(self.output, "No accounts for {}.", self.username)?;
            return Ok(None);
        }
        writeln!(self.output, "Select account:")?;
        for (i, account) in accounts.iter().enumerate() {
            writeln!(
                self.output,
                "{} -- {} ({})",
                i + 1,
                account.account_number,
                account.name
            )?;
        }
        loop {
            let answer = self.prompt("Enter account index: ")?;
            if self.eof {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=accounts.len()).contains(&n) => return Ok(Some(accounts.swap_remove(n - 1))),
                _ => writeln!(self.output, "Invalid account index: {:?}", answer)?,
            }
        }
    }
}

/// Left-aligned columns padded to the widest cell, with a dashed rule under the header.
fn render_table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> std::io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", pad(headers, &widths))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", pad(&rule, &widths))?;
    for row in rows {
        writeln!(out, "{}", pad(row, &widths))?;
    }
    Ok(())
}

fn pad<T: AsRef<str>>(cells: &[T], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
