use crate::skills::catalog::{Catalog, Selection};
use crate::skills::targets::plan::SyncPlan;
use anyhow::{Result, anyhow};
use inquire::error::InquireError;
use inquire::{Confirm, MultiSelect};
use std::io::{self, BufRead, IsTerminal, Write};

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Asks the operator to approve a set of plans before anything is written.
pub trait Confirmer {
    fn confirm(&mut self, selection: &Selection, plans: &[SyncPlan]) -> Result<bool>;
}

/// Approves every plan without asking (`--yes`).
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&mut self, _selection: &Selection, _plans: &[SyncPlan]) -> Result<bool> {
        Ok(true)
    }
}

/// Prints the plan summary and reads a single answer line.
pub struct LineConfirmer<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirmer for LineConfirmer<R, W> {
    fn confirm(&mut self, selection: &Selection, plans: &[SyncPlan]) -> Result<bool> {
        write_plan_summary(&mut self.output, selection, plans)?;
        write!(self.output, "{} ", t!("skills.gate.prompt"))?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }
        Ok(parse_answer(&line))
    }
}

/// Uses an inquire prompt when stdin is a terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&mut self, selection: &Selection, plans: &[SyncPlan]) -> Result<bool> {
        write_plan_summary(&mut io::stdout().lock(), selection, plans)?;
        let prompt = t!("skills.gate.confirm");
        match gate_prompt(&prompt).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(e) => Err(anyhow!(t!("skills.prompt_failed", error = e))),
        }
    }
}

/// A yes/no prompt that answers with `parse_answer` instead of asking again
/// on unrecognized input.
fn gate_prompt(message: &str) -> Confirm<'_> {
    Confirm::new(message)
        .with_default(true)
        .with_parser(&parse_gate_input)
}

fn parse_gate_input(input: &str) -> std::result::Result<bool, ()> {
    Ok(parse_answer(input))
}

/// Empty input, `y` and `yes` accept. Everything else declines.
pub fn parse_answer(line: &str) -> bool {
    let answer = line.trim().to_ascii_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

pub fn write_plan_summary<W: Write>(
    out: &mut W,
    selection: &Selection,
    plans: &[SyncPlan],
) -> io::Result<()> {
    match selection {
        Selection::All => writeln!(out, "{}", t!("skills.gate.all_packages"))?,
        Selection::Packages(ids) => {
            writeln!(out, "{}", t!("skills.gate.packages", count = ids.len()))?;
            for id in ids {
                writeln!(out, "  - {id}")?;
            }
        }
    }
    writeln!(out, "{}", t!("skills.gate.targets", count = plans.len()))?;
    for plan in plans {
        writeln!(
            out,
            "  - {} -> {} ({})",
            plan.target.id,
            plan.target.root.display(),
            plan.mode
        )?;
    }
    Ok(())
}

/// Lets the operator tick packages from the catalog. `None` means the prompt
/// was cancelled.
pub fn pick_packages(catalog: &Catalog) -> Result<Option<Vec<String>>> {
    if !is_interactive() {
        return Err(anyhow!(t!("skills.pick_requires_tty")));
    }
    let ids: Vec<String> = catalog.packages.iter().cloned().collect();
    let prompt = t!("skills.pick_prompt");
    match MultiSelect::new(&prompt, ids).prompt() {
        Ok(selected) => Ok(Some(selected)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(anyhow!(t!("skills.prompt_failed", error = e))),
    }
}
