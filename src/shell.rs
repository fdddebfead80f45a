//! a line-oriented shell over a mounted [FileSys]
use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use anyhow::{anyhow, bail};
use log::{debug, warn};

use crate::fs::{BlockStore, FileSys, FsError, Listing};

pub const PROMPT: &str = "blockfs> ";

/// one parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Cd(String),
    Home,
    Rmdir(String),
    Ls,
    Create(String),
    /// file name and the rest of the line
    Append(String, String),
    Cat(String),
    Tail(String, usize),
    Rm(String),
    Stat(String),
    Quit,
}

fn usage(command: &str) -> Option<&'static str> {
    let usage = match command {
        "mkdir" => "mkdir <name>",
        "cd" => "cd <name>",
        "home" => "home",
        "rmdir" => "rmdir <name>",
        "ls" => "ls",
        "create" => "create <name>",
        "append" => "append <name> <data>",
        "cat" => "cat <name>",
        "tail" => "tail <name> <n>",
        "rm" => "rm <name>",
        "stat" => "stat <name>",
        "quit" | "exit" => "quit",
        _ => return None,
    };
    Some(usage)
}

/// split off the first word, leaving the rest with its leading whitespace removed
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let (command, rest) = split_word(line);
        let args: Vec<&str> = rest.split_whitespace().collect();
        let parsed = match (command, args.as_slice()) {
            ("mkdir", [name]) => Command::Mkdir(name.to_string()),
            ("cd", [name]) => Command::Cd(name.to_string()),
            ("home", []) => Command::Home,
            ("rmdir", [name]) => Command::Rmdir(name.to_string()),
            ("ls", []) => Command::Ls,
            ("create", [name]) => Command::Create(name.to_string()),
            ("append", [_, _, ..]) => {
                let (name, data) = split_word(rest);
                Command::Append(name.to_string(), data.to_string())
            }
            ("cat", [name]) => Command::Cat(name.to_string()),
            ("tail", [name, n]) => {
                let n = n
                    .parse()
                    .map_err(|_| anyhow!("tail: {n:?} is not a byte count"))?;
                Command::Tail(name.to_string(), n)
            }
            ("rm", [name]) => Command::Rm(name.to_string()),
            ("stat", [name]) => Command::Stat(name.to_string()),
            ("quit" | "exit", []) => Command::Quit,
            (command, _) => match usage(command) {
                Some(usage) => bail!("usage: {usage}"),
                None => bail!("unknown command: {command}"),
            },
        };
        Ok(parsed)
    }
}

/// what a successful command prints
enum Output {
    Nothing,
    Content(Vec<u8>),
    Listing(Vec<Listing>),
    Report(String),
}

impl Output {
    fn write_to<W: Write>(self, out: &mut W) -> std::io::Result<()> {
        match self {
            Output::Nothing => Ok(()),
            Output::Content(bytes) => {
                out.write_all(&bytes)?;
                writeln!(out)
            }
            // an empty directory still prints a line
            Output::Listing(entries) if entries.is_empty() => writeln!(out),
            Output::Listing(entries) => {
                for entry in entries {
                    writeln!(out, "{entry}")?;
                }
                Ok(())
            }
            Output::Report(report) => writeln!(out, "{report}"),
        }
    }
}

pub struct Shell<S: BlockStore> {
    fs: FileSys<S>,
    prompt: Option<&'static str>,
}

impl<S: BlockStore> Shell<S> {
    /// a shell that prints no prompt, for scripted input
    pub fn new(fs: FileSys<S>) -> Self {
        Shell { fs, prompt: None }
    }

    /// print [PROMPT] before reading each line
    pub fn interactive(mut self) -> Self {
        self.prompt = Some(PROMPT);
        self
    }

    pub fn into_inner(self) -> FileSys<S> {
        self.fs
    }

    /// run one command, writing its output or its error message to `out`
    ///
    /// # Return
    /// `false` once the shell should stop
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<bool> {
        debug!("executing {command:?}");
        let fs = &mut self.fs;
        let result = match command {
            Command::Quit => return Ok(false),
            Command::Mkdir(name) => fs.mkdir(&name).map(|()| Output::Nothing),
            Command::Cd(name) => fs.cd(&name).map(|()| Output::Nothing),
            Command::Home => {
                fs.home();
                Ok(Output::Nothing)
            }
            Command::Rmdir(name) => fs.rmdir(&name).map(|()| Output::Nothing),
            Command::Ls => fs.ls().map(Output::Listing),
            Command::Create(name) => fs.create(&name).map(|()| Output::Nothing),
            Command::Append(name, data) => {
                fs.append(&name, data.as_bytes()).map(|()| Output::Nothing)
            }
            Command::Cat(name) => fs.cat(&name).map(Output::Content),
            Command::Tail(name, n) => fs.tail(&name, n).map(Output::Content),
            Command::Rm(name) => fs.rm(&name).map(|()| Output::Nothing),
            Command::Stat(name) => fs.stat(&name).map(|stat| Output::Report(stat.to_string())),
        };

        match result {
            Ok(output) => output.write_to(out)?,
            Err(e) => {
                if let FsError::Storage(_) | FsError::Corrupted { .. } = e {
                    warn!("{e}");
                }
                writeln!(out, "{e}")?;
            }
        }
        Ok(true)
    }

    /// read commands from `input` until it ends or a `quit` comes along
    pub fn run<R, W>(&mut self, input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        self.show_prompt(out)?;
        for line in input.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                let keep_going = match line.parse::<Command>() {
                    Ok(command) => self.execute(command, out)?,
                    Err(e) => {
                        writeln!(out, "{e}")?;
                        true
                    }
                };
                if !keep_going {
                    break;
                }
            }
            self.show_prompt(out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn show_prompt<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        if let Some(prompt) = self.prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        Ok(())
    }
}
