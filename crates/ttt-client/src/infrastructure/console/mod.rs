//! Terminal presentation: board rendering and interactive prompts.
//!
//! Rendering is a pure function returning a `String`, so it can be tested
//! with colours switched off.  The prompts block on stdin and must run on a
//! blocking thread (`tokio::task::spawn_blocking`) when called from async
//! code.

use async_trait::async_trait;
use colored::{ColoredString, Colorize};
use dialoguer::Input;
use thiserror::Error;

use ttt_core::protocol::messages::BoardStateMessage;
use ttt_core::Symbol;

use crate::application::game_loop::PlayerConsole;
use crate::application::play::{parse_move_input, PlayerInput};

/// Errors raised while talking to the terminal.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("terminal prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    /// Unreachable in practice: the prompt validator already accepted the text.
    #[error("invalid input: {0}")]
    Input(#[from] crate::application::play::InputError),
}

const ROW_SEPARATOR: &str = "---+---+---";
const GAP: &str = "      ";

/// Renders the position reference grid next to the current board.
///
/// `me` is drawn in green and the opponent in red; with no assigned symbol
/// both are drawn plain.
pub fn render_board(board: &BoardStateMessage, me: Option<Symbol>) -> String {
    let mut out = String::new();
    out.push_str(&format!(" {:<11}{GAP}{}\n", "Positions", "Board"));
    for row in 0..3 {
        let reference: Vec<String> = (0..3).map(|c| (row * 3 + c).to_string()).collect();
        let cells: Vec<String> = (0..3)
            .map(|c| paint(board.cells[row * 3 + c], me).to_string())
            .collect();
        out.push_str(&format!(
            " {} {GAP} {}\n",
            reference.join(" | "),
            cells.join(" | ")
        ));
        if row < 2 {
            out.push_str(&format!("{ROW_SEPARATOR}{GAP}{ROW_SEPARATOR}\n"));
        }
    }
    out
}

fn paint(cell: Option<Symbol>, me: Option<Symbol>) -> ColoredString {
    match cell {
        None => " ".normal(),
        Some(symbol) => {
            let text = symbol.as_char().to_string();
            match me {
                Some(mine) if mine == symbol => text.green().bold(),
                Some(_) => text.red().bold(),
                None => text.normal(),
            }
        }
    }
}

/// Asks for a non-empty display name.
///
/// # Errors
///
/// [`ConsoleError::Prompt`] if the terminal cannot be read.
pub fn prompt_name() -> Result<String, ConsoleError> {
    let name: String = Input::new()
        .with_prompt("Your name")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(name.trim().to_string())
}

/// Asks for a cell `0`–`8` or `quit`, re-prompting until the answer is valid.
///
/// # Errors
///
/// [`ConsoleError::Prompt`] if the terminal cannot be read.
pub fn prompt_move() -> Result<PlayerInput, ConsoleError> {
    let answer: String = Input::new()
        .with_prompt("Your move (0-8, or 'quit')")
        .validate_with(|input: &String| -> Result<(), String> {
            parse_move_input(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;
    Ok(parse_move_input(&answer)?)
}

/// [`PlayerConsole`] on stdout and stdin.
///
/// Prompts run on a blocking thread so the runtime keeps servicing the socket.
#[derive(Debug, Default)]
pub struct TerminalConsole;

#[async_trait]
impl PlayerConsole for TerminalConsole {
    fn show_status(&mut self, line: &str) {
        println!("{line}");
    }

    fn show_board(&mut self, board: &BoardStateMessage, me: Option<Symbol>) {
        println!("\n{}", render_board(board, me));
    }

    async fn choose_move(&mut self) -> Result<PlayerInput, String> {
        match tokio::task::spawn_blocking(prompt_move).await {
            Ok(answer) => answer.map_err(|e| e.to_string()),
            Err(e) => Err(format!("move prompt task failed: {e}")),
        }
    }
}
