use serde::{Deserialize, Serialize};

use crate::controller::SessionController;
use crate::error::Result;

/// Every user intent that can be driven from a command string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    // Navigation
    Navigate(String),
    Back,
    Forward,
    Up,
    Refresh,
    Home,

    // Search
    Search(String),
    Type(String),
    ClearSearch,

    // Selection & filtering
    Select(String),
    ToggleHidden,

    // File operations
    Touch(String),
    Mkdir(String),
    Rename { path: String, new_name: String },
    Delete(String),
}

/// What applying a command did, for printing back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored,
    Created(String),
    Done,
}

impl Command {
    /// Parse a command from its string form, e.g. `navigate:/tmp` or `back`
    pub fn from_string(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "back" | "b" => return Ok(Command::Back),
            "forward" | "f" => return Ok(Command::Forward),
            "up" | ".." => return Ok(Command::Up),
            "refresh" | "r" => return Ok(Command::Refresh),
            "home" | "~" => return Ok(Command::Home),
            "clear_search" | "escape" => return Ok(Command::ClearSearch),
            "toggle_hidden" => return Ok(Command::ToggleHidden),
            _ => {}
        }

        let Some((name, argument)) = s.split_once(':') else {
            return Err(format!("Unknown command: {}", s));
        };
        let required = |what: &str| {
            if argument.trim().is_empty() {
                Err(format!("{} requires an argument", what))
            } else {
                Ok(argument.to_string())
            }
        };

        match name.to_lowercase().as_str() {
            "navigate" | "cd" => Ok(Command::Navigate(required("navigate")?)),
            "search" => Ok(Command::Search(argument.to_string())),
            "type" => Ok(Command::Type(argument.to_string())),
            "select" => Ok(Command::Select(required("select")?)),
            "touch" => Ok(Command::Touch(required("touch")?)),
            "mkdir" => Ok(Command::Mkdir(required("mkdir")?)),
            "delete" => Ok(Command::Delete(required("delete")?)),
            "rename" => {
                let (path, new_name) = argument
                    .split_once('|')
                    .ok_or_else(|| "rename expects <path>|<new name>".to_string())?;
                Ok(Command::Rename {
                    path: path.to_string(),
                    new_name: new_name.to_string(),
                })
            }
            _ => Err(format!("Unknown command: {}", s)),
        }
    }

    /// Apply the command to a controller. File operations are awaited;
    /// everything else only schedules work.
    pub async fn apply(&self, controller: &mut SessionController) -> Result<Outcome> {
        let applied = |changed: bool| {
            if changed {
                Outcome::Applied
            } else {
                Outcome::Ignored
            }
        };

        match self {
            Command::Navigate(path) => Ok(applied(controller.navigate(path))),
            Command::Back => Ok(applied(controller.back())),
            Command::Forward => Ok(applied(controller.forward())),
            Command::Up => Ok(applied(controller.up())),
            Command::Refresh => Ok(applied(controller.refresh())),
            Command::Home => {
                controller.home();
                Ok(Outcome::Applied)
            }
            Command::Search(query) => Ok(applied(controller.search(query))),
            Command::Type(text) => {
                controller.set_search_input(text);
                Ok(Outcome::Applied)
            }
            Command::ClearSearch => {
                controller.clear_search();
                Ok(Outcome::Applied)
            }
            Command::Select(path) => Ok(applied(controller.select_path(path))),
            Command::ToggleHidden => {
                controller.toggle_hidden();
                Ok(Outcome::Applied)
            }
            Command::Touch(name) => controller.create_file(name).await.map(Outcome::Created),
            Command::Mkdir(name) => controller.create_directory(name).await.map(Outcome::Created),
            Command::Rename { path, new_name } => {
                controller.rename_item(path, new_name).await?;
                controller.refresh();
                Ok(Outcome::Done)
            }
            Command::Delete(path) => {
                controller.delete_item(path).await?;
                Ok(Outcome::Done)
            }
        }
    }

    pub fn to_string(&self) -> String {
        match self {
            Command::Navigate(path) => format!("navigate:{}", path),
            Command::Back => "back".to_string(),
            Command::Forward => "forward".to_string(),
            Command::Up => "up".to_string(),
            Command::Refresh => "refresh".to_string(),
            Command::Home => "home".to_string(),
            Command::Search(query) => format!("search:{}", query),
            Command::Type(text) => format!("type:{}", text),
            Command::ClearSearch => "clear_search".to_string(),
            Command::Select(path) => format!("select:{}", path),
            Command::ToggleHidden => "toggle_hidden".to_string(),
            Command::Touch(name) => format!("touch:{}", name),
            Command::Mkdir(name) => format!("mkdir:{}", name),
            Command::Rename { path, new_name } => format!("rename:{}|{}", path, new_name),
            Command::Delete(path) => format!("delete:{}", path),
        }
    }
}
