//! Line-oriented directive parser for migration scripts.
//!
//! A script has a fixed layout, enforced here:
//!
//! ```sql
//! -- driftway:tag 0002-split-contact-name
//! -- driftway:use crm.contact key id integer
//! -- driftway:use crm.contact full_name text
//! -- driftway:run
//! UPDATE dw_shadow.crm__contact SET full_name = trim(full_name);
//! -- driftway:apply crm.contact (id, full_name)
//! ```
//!
//! The tag comes first, then `use` declarations, then the `run` separator
//! introducing raw SQL batches (additional `run` lines split further
//! batches), then `apply` calls. Plain comments and blank lines may appear
//! anywhere; SQL outside the body section is an error.

use crate::error::{ScriptError, ScriptResult};
use dw_core::{ColumnType, ScriptTag};
use serde::Serialize;

/// Comment prefix that marks a directive line.
const DIRECTIVE_PREFIX: &str = "-- driftway:";

/// A `use` declaration: ensure a shadow column exists and is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UseDecl {
    /// Module (schema) of the original entity
    pub module: String,

    /// Entity (table) name
    pub entity: String,

    /// Column name
    pub column: String,

    /// Declared logical type of the shadow column
    pub ty: ColumnType,

    /// Whether this column establishes row identity for the entity
    pub key: bool,
}

/// An `apply` call: reconcile shadow data back into the original table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyDecl {
    /// Module (schema) of the original entity
    pub module: String,

    /// Entity (table) name
    pub entity: String,

    /// Columns to propagate; must include the entity's key column
    pub columns: Vec<String>,
}

/// A fully parsed migration script.
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// The script's stable identity
    pub tag: ScriptTag,

    /// Shadow column declarations, in order
    pub uses: Vec<UseDecl>,

    /// Raw SQL batches, in order
    pub batches: Vec<String>,

    /// Apply calls, in order
    pub applies: Vec<ApplyDecl>,
}

/// Parser position within the fixed script layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Uses,
    Body,
    Applies,
}

/// Parse a script's source text.
pub fn parse_script(source: &str) -> ScriptResult<ParsedScript> {
    let mut tag: Option<ScriptTag> = None;
    let mut uses = Vec::new();
    let mut batches = Vec::new();
    let mut applies = Vec::new();
    let mut section = Section::Header;
    let mut batch = String::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) {
            let rest = rest.trim();
            let (name, args) = match rest.split_once(char::is_whitespace) {
                Some((name, args)) => (name, args.trim()),
                None => (rest, ""),
            };

            match name {
                "tag" => {
                    if tag.is_some() {
                        return Err(ScriptError::DuplicateTag { line: line_no });
                    }
                    if section != Section::Header {
                        return Err(ScriptError::DirectiveOutOfOrder {
                            directive: "tag".to_string(),
                            line: line_no,
                            message: "the tag must be the first directive".to_string(),
                        });
                    }
                    tag = Some(ScriptTag::try_new(args).ok_or_else(|| {
                        ScriptError::InvalidTag {
                            value: args.to_string(),
                            line: line_no,
                        }
                    })?);
                    section = Section::Uses;
                }
                "use" => {
                    if section != Section::Uses {
                        return Err(out_of_order("use", line_no, section));
                    }
                    uses.push(parse_use(args, line_no)?);
                }
                "run" => match section {
                    Section::Uses => section = Section::Body,
                    Section::Body => {
                        push_batch(&mut batches, &mut batch);
                    }
                    _ => return Err(out_of_order("run", line_no, section)),
                },
                "apply" => {
                    match section {
                        Section::Uses => section = Section::Applies,
                        Section::Body => {
                            push_batch(&mut batches, &mut batch);
                            section = Section::Applies;
                        }
                        Section::Applies => {}
                        Section::Header => return Err(out_of_order("apply", line_no, section)),
                    }
                    applies.push(parse_apply(args, line_no)?);
                }
                other => {
                    return Err(ScriptError::MalformedDirective {
                        line: line_no,
                        message: format!("unknown directive '{}'", other),
                    });
                }
            }
            continue;
        }

        match section {
            Section::Body => {
                batch.push_str(raw_line);
                batch.push('\n');
            }
            _ => {
                // Outside the body only blank lines and plain comments are
                // allowed; loose SQL there would silently never execute.
                if !line.is_empty() && !line.starts_with("--") {
                    if section == Section::Header {
                        return Err(ScriptError::MissingTag);
                    }
                    return Err(ScriptError::MalformedDirective {
                        line: line_no,
                        message: "SQL statements must follow a 'run' separator".to_string(),
                    });
                }
            }
        }
    }

    push_batch(&mut batches, &mut batch);

    let tag = tag.ok_or(ScriptError::MissingTag)?;

    Ok(ParsedScript {
        tag,
        uses,
        batches,
        applies,
    })
}

/// Flush the current batch if it contains anything but whitespace.
fn push_batch(batches: &mut Vec<String>, batch: &mut String) {
    if !batch.trim().is_empty() {
        batches.push(std::mem::take(batch));
    } else {
        batch.clear();
    }
}

fn out_of_order(directive: &str, line: usize, section: Section) -> ScriptError {
    let message = match section {
        Section::Header => "the tag must come first".to_string(),
        Section::Uses => "not valid in the use section".to_string(),
        Section::Body => "not valid after the run separator".to_string(),
        Section::Applies => "not valid after apply directives".to_string(),
    };
    ScriptError::DirectiveOutOfOrder {
        directive: directive.to_string(),
        line,
        message,
    }
}

/// Parse `<module>.<entity> [key] <column> <type>`.
fn parse_use(args: &str, line: usize) -> ScriptResult<UseDecl> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    let (target, key, column, ty_name) = match tokens.as_slice() {
        [target, "key", column, ty] => (*target, true, *column, *ty),
        [target, column, ty] => (*target, false, *column, *ty),
        _ => {
            return Err(ScriptError::MalformedDirective {
                line,
                message: "expected 'use <module>.<entity> [key] <column> <type>'".to_string(),
            });
        }
    };

    let (module, entity) = parse_target(target, line)?;
    let column = parse_ident(column, line)?;
    let ty = ColumnType::parse(ty_name).ok_or_else(|| ScriptError::UnknownColumnType {
        value: ty_name.to_string(),
        line,
    })?;

    Ok(UseDecl {
        module,
        entity,
        column,
        ty,
        key,
    })
}

/// Parse `<module>.<entity> (<col>, <col>, ...)`.
fn parse_apply(args: &str, line: usize) -> ScriptResult<ApplyDecl> {
    let (target, list) = match args.split_once('(') {
        Some((target, rest)) => {
            let Some(list) = rest.trim_end().strip_suffix(')') else {
                return Err(ScriptError::MalformedDirective {
                    line,
                    message: "unclosed column list; expected '(col, col, ...)'".to_string(),
                });
            };
            (target.trim(), list)
        }
        None => {
            return Err(ScriptError::MalformedDirective {
                line,
                message: "expected 'apply <module>.<entity> (<col>, ...)'".to_string(),
            });
        }
    };

    let (module, entity) = parse_target(target, line)?;

    let mut columns = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        columns.push(parse_ident(part, line)?);
    }
    if columns.is_empty() {
        return Err(ScriptError::EmptyColumnList { line });
    }

    Ok(ApplyDecl {
        module,
        entity,
        columns,
    })
}

/// Split a `<module>.<entity>` target into validated parts.
fn parse_target(target: &str, line: usize) -> ScriptResult<(String, String)> {
    let Some((module, entity)) = target.split_once('.') else {
        return Err(ScriptError::MalformedDirective {
            line,
            message: format!("expected '<module>.<entity>', found '{}'", target),
        });
    };
    Ok((parse_ident(module, line)?, parse_ident(entity, line)?))
}

/// Validate a directive identifier: ASCII alphanumerics and underscores.
fn parse_ident(ident: &str, line: usize) -> ScriptResult<String> {
    if ident.is_empty() || !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ScriptError::MalformedDirective {
            line,
            message: format!("invalid identifier '{}'", ident),
        });
    }
    Ok(ident.to_string())
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
