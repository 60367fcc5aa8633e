//! Interactive query form
//!
//! Filters are numbered from 1 at the prompt. Every failed action is printed
//! and the prompt comes back; nothing typed here ends the session except
//! `quit` or end of input.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::format_draft;
use crate::error::QueryError;
use crate::query::{
    Condition, DraftSnapshot, FilterEdit, FilterField, Generator, Operation, Parser,
};
use crate::session::{Session, Submitted};
use crate::store::{QueryId, QueryStore};

const HELP: &str = "\
Commands:
  show                          current draft, result and loaded query
  entities                      entities and their attributes
  op <find|create|update|deleteAll>
  entity [name]                 select an entity (resets filters); no name clears it
  add                           append a filter
  rm <n>                        remove filter n
  set <n> attribute <name>      set a filter field
  set <n> condition <eq|ne|gt|ge|lt|le>
  set <n> value <text>
  submit                        generate YAML for the draft
  save <name>                   save the generated YAML
  list                          saved queries
  load <id>                     replace the draft with a saved query
  delete <id>                   delete a saved query
  help | quit";

/// A parsed prompt line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Show,
    Entities,
    Operation(Operation),
    Entity(String),
    Add,
    /// Zero-based filter index
    Remove(usize),
    Set(usize, FilterEdit),
    Submit,
    Save(String),
    List,
    Load(QueryId),
    Delete(QueryId),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one prompt line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, QueryError> {
    let (word, rest) = split_word(line.trim());

    let command = match word {
        "" => return Ok(None),
        "help" | "?" => ShellCommand::Help,
        "show" => ShellCommand::Show,
        "entities" | "models" => ShellCommand::Entities,
        "op" | "function" => ShellCommand::Operation(rest.parse()?),
        "entity" | "model" => ShellCommand::Entity(rest.to_string()),
        "add" => ShellCommand::Add,
        "rm" | "remove" => ShellCommand::Remove(parse_position(rest)?),
        "set" => {
            let (position, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            let field: FilterField = field.parse()?;
            ShellCommand::Set(parse_position(position)?, FilterEdit::parse(field, value)?)
        }
        "submit" | "generate" => ShellCommand::Submit,
        "save" => ShellCommand::Save(rest.to_string()),
        "list" | "ls" => ShellCommand::List,
        "load" => ShellCommand::Load(parse_id(rest)?),
        "delete" | "del" => ShellCommand::Delete(parse_id(rest)?),
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => {
            return Err(QueryError::validation(format!(
                "Unknown command '{}', type `help`",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// 1-based position at the prompt, 0-based index internally
fn parse_position(s: &str) -> Result<usize, QueryError> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(QueryError::validation(format!("Invalid filter number '{}'", s.trim()))),
    }
}

fn parse_id(s: &str) -> Result<QueryId, QueryError> {
    s.trim()
        .parse()
        .map_err(|_| QueryError::validation(format!("Invalid query id '{}'", s.trim())))
}

/// Run one command against the session, reporting failures to `out`
pub async fn execute<G, P, S, W>(
    session: &mut Session<G, P, S>,
    command: ShellCommand,
    out: &mut W,
) -> std::io::Result<Flow>
where
    G: Generator,
    P: Parser,
    S: QueryStore,
    W: Write,
{
    let outcome: Result<(), QueryError> = match command {
        ShellCommand::Quit => return Ok(Flow::Quit),
        ShellCommand::Help => {
            writeln!(out, "{}", HELP)?;
            Ok(())
        }
        ShellCommand::Show => {
            show(session, out)?;
            Ok(())
        }
        ShellCommand::Entities => {
            let catalog = session.builder().catalog();
            if catalog.is_empty() {
                writeln!(out, "No entities available")?;
            }
            for entity in catalog.entities() {
                writeln!(out, "{}: {}", entity.name, entity.attributes.join(", "))?;
            }
            Ok(())
        }
        ShellCommand::Operation(op) => {
            session.builder_mut().set_operation(op);
            Ok(())
        }
        ShellCommand::Entity(name) => {
            session.builder_mut().set_entity(name);
            Ok(())
        }
        ShellCommand::Add => {
            session.builder_mut().add_filter();
            Ok(())
        }
        ShellCommand::Remove(index) => match check_index(session, index) {
            Ok(()) => {
                if !session.builder_mut().remove_filter(index) {
                    writeln!(out, "The last filter cannot be removed")?;
                }
                Ok(())
            }
            Err(err) => Err(err),
        },
        ShellCommand::Set(index, edit) => check_index(session, index)
            .and_then(|()| session.builder_mut().set_filter_field(index, edit)),
        ShellCommand::Submit => match session.submit().await {
            Ok(Submitted::Applied) => {
                if let Some(result) = session.result() {
                    writeln!(out, "Generated YAML:\n{}", result.text.trim_end())?;
                }
                Ok(())
            }
            Ok(Submitted::Superseded) => {
                writeln!(out, "Draft changed while generating, submit again")?;
                Ok(())
            }
            Err(err) => Err(err),
        },
        ShellCommand::Save(name) => match session.save(&name).await {
            Ok(id) => {
                writeln!(out, "✓ Query saved as #{}", id)?;
                Ok(())
            }
            Err(err) => Err(err),
        },
        ShellCommand::List => {
            let refreshed = session.refresh().await;
            let entries = session.library().entries();
            if entries.is_empty() {
                writeln!(out, "No saved queries yet")?;
            }
            for entry in entries {
                writeln!(out, "{:>4}  {}", entry.id, entry.name)?;
            }
            refreshed
        }
        ShellCommand::Load(id) => match session.load(id).await {
            Ok(()) => {
                writeln!(out, "✓ Query #{} loaded", id)?;
                Ok(())
            }
            Err(err) => Err(err),
        },
        ShellCommand::Delete(id) => match session.delete(id).await {
            Ok(()) => {
                writeln!(out, "✓ Query #{} deleted", id)?;
                Ok(())
            }
            Err(err) => Err(err),
        },
    };

    if let Err(err) = outcome {
        report(&err, out)?;
    }

    Ok(Flow::Continue)
}

/// Print a failed action; collaborator failures get a hint since the input was fine
fn report<W: Write>(err: &QueryError, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Error: {}", err)?;
    if err.is_transient() {
        let hint = match err {
            QueryError::NotFound(_) => "the saved query list was refreshed, see `list`",
            _ => "nothing was changed, try again",
        };
        writeln!(out, "  {}", hint)?;
    }
    Ok(())
}

fn check_index<G, P, S>(session: &Session<G, P, S>, index: usize) -> Result<(), QueryError>
where
    G: Generator,
    P: Parser,
    S: QueryStore,
{
    let len = session.builder().draft().filters.len();
    if index < len {
        Ok(())
    } else {
        Err(QueryError::validation(format!(
            "No filter #{} (the draft has {})",
            index + 1,
            len
        )))
    }
}

fn show<G, P, S, W>(session: &Session<G, P, S>, out: &mut W) -> std::io::Result<()>
where
    G: Generator,
    P: Parser,
    S: QueryStore,
    W: Write,
{
    render_snapshot(&session.builder().snapshot(), out)?;

    if let Some(loaded) = session.library().current() {
        writeln!(out, "loaded:   #{} {}", loaded.id, loaded.name)?;
    }

    match session.result() {
        Some(result) if session.result_is_current() => {
            writeln!(out, "result:\n{}", result.text.trim_end())?;
        }
        Some(_) => writeln!(out, "result:   out of date, submit again")?,
        None => writeln!(out, "result:   none")?,
    }

    Ok(())
}

fn render_snapshot<W: Write>(snapshot: &DraftSnapshot, out: &mut W) -> std::io::Result<()> {
    write!(out, "{}", format_draft(&snapshot.draft))?;
    if snapshot.draft.entity.is_some() {
        let attributes = if snapshot.available_attributes.is_empty() {
            "<none>".to_string()
        } else {
            snapshot.available_attributes.join(", ")
        };
        writeln!(out, "attributes: {}", attributes)?;
    }
    Ok(())
}

/// Read commands from stdin until `quit` or end of input
pub async fn run<G, P, S>(session: &mut Session<G, P, S>) -> Result<()>
where
    G: Generator,
    P: Parser,
    S: QueryStore,
{
    let mut changes = session.builder().subscribe();
    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    writeln!(stdout, "BML Query Generator - type `help` for commands")?;
    writeln!(
        stdout,
        "conditions: {}",
        Condition::ALL
            .iter()
            .map(|c| format!("{} ({})", c, c.label()))
            .collect::<Vec<_>>()
            .join(", ")
    )?;
    show(session, &mut stdout)?;

    loop {
        write!(stdout, "bmlq> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(stdout)?;
            break;
        };

        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                if execute(session, command, &mut stdout).await? == Flow::Quit {
                    break;
                }
            }
            Err(err) => writeln!(stdout, "Error: {}", err)?,
        }

        // Re-render whenever the draft changed
        if changes.has_changed().unwrap_or(false) {
            let snapshot = changes.borrow_and_update().clone();
            render_snapshot(&snapshot, &mut stdout)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, YamlCodec};
    use crate::schema::{Catalog, EntitySchema};
    use crate::testing::MemoryStore;

    async fn session() -> Session<YamlCodec, YamlCodec, MemoryStore> {
        let catalog = Catalog::new(vec![EntitySchema::new("User", ["id", "email", "age"])]);
        Session::start(&catalog, YamlCodec, YamlCodec, MemoryStore::default()).await
    }

    async fn run_lines(
        session: &mut Session<YamlCodec, YamlCodec, MemoryStore>,
        lines: &[&str],
    ) -> String {
        let mut out = Vec::new();
        for line in lines {
            match parse_line(line) {
                Ok(Some(command)) => {
                    execute(session, command, &mut out).await.unwrap();
                }
                Ok(None) => {}
                Err(err) => writeln!(out, "Error: {}", err).unwrap(),
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(
            parse_line("op deleteAll").unwrap(),
            Some(ShellCommand::Operation(Operation::DeleteAll))
        );
        assert_eq!(parse_line("entity").unwrap(), Some(ShellCommand::Entity(String::new())));
        assert_eq!(parse_line("rm 2").unwrap(), Some(ShellCommand::Remove(1)));
        assert_eq!(
            parse_line("set 1 value hello world").unwrap(),
            Some(ShellCommand::Set(0, FilterEdit::ConditionValue("hello world".to_string())))
        );
        assert_eq!(
            parse_line("set 3 condition ge").unwrap(),
            Some(ShellCommand::Set(2, FilterEdit::Condition(Condition::Ge)))
        );
        assert_eq!(
            parse_line("save my adults").unwrap(),
            Some(ShellCommand::Save("my adults".to_string()))
        );
        assert_eq!(parse_line("load 12").unwrap(), Some(ShellCommand::Load(12)));
    }

    #[test]
    fn test_parse_line_errors() {
        for line in ["frobnicate", "rm 0", "rm x", "set 1 colour red", "set 1 condition like", "load abc"] {
            assert!(
                matches!(parse_line(line), Err(QueryError::Validation(_))),
                "expected validation error for {:?}",
                line
            );
        }
    }

    #[tokio::test]
    async fn test_form_session() {
        let mut session = session().await;

        let out = run_lines(
            &mut session,
            &[
                "entity User",
                "set 1 attribute age",
                "set 1 condition gt",
                "set 1 value 18",
                "add",
                "set 2 attribute email",
                "set 2 value a@b.com",
                "submit",
                "save adults",
                "list",
            ],
        )
        .await;

        assert!(out.contains("Generated YAML:"), "{}", out);
        assert!(out.contains("✓ Query saved as #1"), "{}", out);
        assert!(out.contains("   1  adults"), "{}", out);
        assert_eq!(
            session.builder().draft().filters,
            vec![
                Filter::new("age", Condition::Gt, "18"),
                Filter::new("email", Condition::Eq, "a@b.com"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_fatal() {
        let mut session = session().await;

        let out = run_lines(
            &mut session,
            &["rm 1", "rm 4", "set 1 attribute total", "submit", "save x", "load 9", "frob"],
        )
        .await;

        assert!(out.contains("The last filter cannot be removed"), "{}", out);
        assert!(out.contains("No filter #4"), "{}", out);
        assert!(out.contains("Error: failed to generate query: no entity selected"), "{}", out);
        assert!(out.contains("Error: No query to save"), "{}", out);
        assert!(out.contains("Error: saved query 9 not found"), "{}", out);
        assert!(out.contains("Unknown command 'frob'"), "{}", out);
        assert_eq!(session.builder().draft().filters.len(), 1);
    }

    #[tokio::test]
    async fn test_show_marks_stale_result() {
        let mut session = session().await;
        run_lines(&mut session, &["entity User", "set 1 attribute id", "submit"]).await;

        let out = run_lines(&mut session, &["set 1 value 7", "show"]).await;

        assert!(out.contains("attributes: id, email, age"), "{}", out);
        assert!(out.contains("out of date"), "{}", out);
    }

    #[tokio::test]
    async fn test_collaborator_failures_suggest_retry() {
        let mut session = session().await;
        run_lines(&mut session, &["entity User", "set 1 attribute id", "submit"]).await;
        session.library().store().set_unavailable(true);

        let out = run_lines(&mut session, &["save ids"]).await;
        assert!(out.contains("Error: store unavailable"), "{}", out);
        assert!(out.contains("try again"), "{}", out);

        session.library().store().set_unavailable(false);
        let out = run_lines(&mut session, &["delete 42", "save  "]).await;
        assert!(out.contains("Error: saved query 42 not found"), "{}", out);
        assert!(out.contains("see `list`"), "{}", out);
        assert!(out.contains("Error: Please enter a query name"), "{}", out);
        assert_eq!(out.lines().filter(|l| l.starts_with("  ")).count(), 1, "{}", out);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_errors_are_returned() {
        let mut session = session().await;
        run_lines(&mut session, &["entity User", "set 1 attribute id", "submit"]).await;

        for command in [ShellCommand::Save("ids".to_string()), ShellCommand::Remove(0)] {
            let err = execute(&mut session, command, &mut BrokenPipe).await.unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        }
        assert_eq!(session.library().entries().len(), 1);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut session = session().await;
        let mut out = Vec::new();
        let flow = execute(&mut session, ShellCommand::Quit, &mut out).await.unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
