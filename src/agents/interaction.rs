use crate::error::{ModManError, Result};
use crate::model::PendingUpdate;
use colored::Colorize;
use std::io::{BufRead, Write};

/// Walks the user through pending updates and collects the ones to apply.
pub struct ModulePicker<R, W> {
    input: R,
    output: W,
    apply_all: bool,
}

impl<R: BufRead, W: Write> ModulePicker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            apply_all: false,
        }
    }

    /// Asks about each update in turn and returns the accepted names.
    ///
    /// Answering `q` (or closing the input) cancels the whole selection.
    pub fn pick(&mut self, updates: &[PendingUpdate]) -> Result<Vec<String>> {
        let mut selected = Vec::new();
        for update in updates {
            if self.confirm(update)? {
                selected.push(update.name.clone());
            }
        }
        Ok(selected)
    }

    fn confirm(&mut self, update: &PendingUpdate) -> Result<bool> {
        writeln!(
            self.output,
            "\n{} {} {} to {}",
            update.name.white().bold(),
            "from".dimmed(),
            update.current_version.red(),
            update.new_version.green().bold()
        )?;

        if self.apply_all {
            writeln!(
                self.output,
                "{}",
                "Auto-selecting (previously selected 'all').".dimmed()
            )?;
            return Ok(true);
        }

        loop {
            write!(self.output, "{}", "Update this module? [Y/n/a/q]: ".bold())?;
            self.output.flush()?;

            let mut input = String::new();
            if self.input.read_line(&mut input)? == 0 {
                return Err(ModManError::UserCancelled);
            }

            match input.trim().to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => {
                    writeln!(self.output, "{}", "Skipping this module.".dimmed())?;
                    return Ok(false);
                }
                "a" | "all" => {
                    writeln!(
                        self.output,
                        "{}",
                        "Selecting this and all remaining modules.".green().bold()
                    )?;
                    self.apply_all = true;
                    return Ok(true);
                }
                "q" | "quit" => {
                    writeln!(
                        self.output,
                        "{}",
                        "Stopping update process at user request.".yellow()
                    )?;
                    return Err(ModManError::UserCancelled);
                }
                _ => {
                    writeln!(
                        self.output,
                        "{}",
                        "Please answer with y(es), n(o), a(ll), or q(uit).".red()
                    )?;
                }
            }
        }
    }
}
