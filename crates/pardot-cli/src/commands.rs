//! Command-line argument parsing.

use anyhow::{anyhow, bail, Result};
use pardot_core::{FieldValue, FormFields, ObjectType, Operation};

pub const USAGE: &str = "\
Usage: pardot <command>

Commands:
  login                                              Authenticate and remember the password
  logout                                             Forget the cached api key and password
  read <object> <id>                                 Read an object by id
  op <object> <operation> <id> [k=v ...]             Run an operation on an object by id
  op-by <object> <operation> <field> <value> [k=v ...]
                                                     Run an operation on an object by field
  query <object> [k=v ...]                           Query objects (limit, offset, filters)

Objects:    email, list, opportunity, prospect, prospectAccount, user, visit, visitor
Operations: create, read, update, delete, undelete, query";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login,
    Logout,
    Data(Request),
}

/// A command that calls the API
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ById {
        object: ObjectType,
        operation: Operation,
        id: String,
        fields: FormFields,
    },
    ByField {
        object: ObjectType,
        operation: Operation,
        field: String,
        value: String,
        fields: FormFields,
    },
    Query {
        object: ObjectType,
        filters: FormFields,
    },
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("No command given"))?;

        match name.as_str() {
            "login" => Ok(Command::Login),
            "logout" => Ok(Command::Logout),
            "read" => match rest {
                [object, id] => Ok(Command::Data(Request::ById {
                    object: parse_object(object)?,
                    operation: Operation::Read,
                    id: id.clone(),
                    fields: FormFields::new(),
                })),
                _ => bail!("read expects <object> <id>"),
            },
            "op" => match rest {
                [object, operation, id, pairs @ ..] => Ok(Command::Data(Request::ById {
                    object: parse_object(object)?,
                    operation: parse_operation(operation)?,
                    id: id.clone(),
                    fields: parse_pairs(pairs)?,
                })),
                _ => bail!("op expects <object> <operation> <id> [k=v ...]"),
            },
            "op-by" => match rest {
                [object, operation, field, value, pairs @ ..] => Ok(Command::Data(Request::ByField {
                    object: parse_object(object)?,
                    operation: parse_operation(operation)?,
                    field: field.clone(),
                    value: value.clone(),
                    fields: parse_pairs(pairs)?,
                })),
                _ => bail!("op-by expects <object> <operation> <field> <value> [k=v ...]"),
            },
            "query" => match rest {
                [object, pairs @ ..] => Ok(Command::Data(Request::Query {
                    object: parse_object(object)?,
                    filters: parse_pairs(pairs)?,
                })),
                _ => bail!("query expects <object> [k=v ...]"),
            },
            other => bail!("Unknown command: {}", other),
        }
    }
}

fn parse_object(raw: &str) -> Result<ObjectType> {
    raw.parse().map_err(|e: String| anyhow!(e))
}

fn parse_operation(raw: &str) -> Result<Operation> {
    raw.parse().map_err(|e: String| anyhow!(e))
}

/// `key=value` arguments; values are typed with [`FieldValue::infer`]
fn parse_pairs(pairs: &[String]) -> Result<FormFields> {
    pairs
        .iter()
        .map(|pair| -> Result<(String, FieldValue)> {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected key=value, got: {}", pair))?;
            if key.is_empty() {
                bail!("Empty field name in: {}", pair);
            }
            Ok((key.to_string(), FieldValue::infer(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_read() {
        let cmd = Command::parse(&args(&["read", "prospect", "63045632"])).unwrap();
        assert_eq!(
            cmd,
            Command::Data(Request::ById {
                object: ObjectType::Prospect,
                operation: Operation::Read,
                id: "63045632".to_string(),
                fields: FormFields::new(),
            })
        );
    }

    #[test]
    fn test_parse_query_with_typed_filters() {
        let cmd = Command::parse(&args(&[
            "query",
            "prospect",
            "assigned=true",
            "score_greater_than=100",
            "limit=4",
            "updated_after=yesterday",
        ]))
        .unwrap();

        let Command::Data(Request::Query { object, filters }) = cmd else {
            panic!("expected query command");
        };
        assert_eq!(object, ObjectType::Prospect);
        assert_eq!(filters.get("assigned"), Some(&FieldValue::Bool(true)));
        assert_eq!(filters.get("score_greater_than"), Some(&FieldValue::Int(100)));
        assert_eq!(filters.get("limit"), Some(&FieldValue::Int(4)));
        assert_eq!(filters.get("updated_after"), Some(&FieldValue::from("yesterday")));
    }

    #[test]
    fn test_parse_op_by_field() {
        let cmd = Command::parse(&args(&[
            "op-by", "prospect", "update", "email", "a@b.com", "score=50",
        ]))
        .unwrap();
        assert!(matches!(
            cmd,
            Command::Data(Request::ByField { operation: Operation::Update, ref field, .. })
                if field == "email"
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(&args(&[])).is_err());
        assert!(Command::parse(&args(&["read", "prospect"])).is_err());
        assert!(Command::parse(&args(&["read", "campaign", "1"])).is_err());
        assert!(Command::parse(&args(&["op", "prospect", "upsert", "1"])).is_err());
        assert!(Command::parse(&args(&["query", "prospect", "limit"])).is_err());
        assert!(Command::parse(&args(&["query", "prospect", "=4"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
    }
}
