//! Conversions between attribute values and Runscope entity fields
//!
//! `expand_*` turns declared blocks into entity fields, `flatten_*` turns
//! entity fields back into attribute values for the stored state.

use declarative::{AttributeError, Block, Value};
use runscope::{
    Assertion, Contact, EmailSettings, EnvironmentIntegration, RemoteAgent, StepAuth, Variable,
};
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, AttributeError>;

/// Build a nested block, leaving out zero values
fn block(entries: &[(&str, Value)]) -> Value {
    Value::Map(
        entries
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect(),
    )
}

// ============================================================================
// Headers
// ============================================================================

/// Fold `{header, value}` pairs into a multi-valued map, keeping pair order per header
pub fn expand_headers(blocks: &[Block<'_>]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for b in blocks {
        headers
            .entry(b.string("header")?)
            .or_default()
            .push(b.string("value")?);
    }
    Ok(headers)
}

/// Unfold a multi-valued header map into `{header, value}` pairs
pub fn flatten_headers(headers: &BTreeMap<String, Vec<String>>) -> Vec<Value> {
    headers
        .iter()
        .flat_map(|(header, values)| {
            values.iter().map(move |value| {
                block(&[("header", header.into()), ("value", value.into())])
            })
        })
        .collect()
}

// ============================================================================
// Variables and assertions
// ============================================================================

pub fn expand_variables(blocks: &[Block<'_>]) -> Result<Vec<Variable>> {
    blocks
        .iter()
        .map(|b| {
            Ok(Variable {
                name: b.string("name")?,
                property: b.string("property")?,
                source: b.string("source")?,
            })
        })
        .collect()
}

pub fn flatten_variables(variables: &[Variable]) -> Value {
    Value::List(
        variables
            .iter()
            .map(|v| {
                block(&[
                    ("name", (&v.name).into()),
                    ("property", (&v.property).into()),
                    ("source", (&v.source).into()),
                ])
            })
            .collect(),
    )
}

/// Declared assertion values are strings; an empty one is left out
pub fn expand_assertions(blocks: &[Block<'_>]) -> Result<Vec<Assertion>> {
    blocks
        .iter()
        .map(|b| {
            let value = b
                .get_str("value")?
                .map_or(serde_json::Value::Null, |v| {
                    serde_json::Value::String(v.to_string())
                });
            Ok(Assertion {
                source: b.string("source")?,
                property: b.string("property")?,
                comparison: b.string("comparison")?,
                value,
            })
        })
        .collect()
}

fn assertion_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn flatten_assertions(assertions: &[Assertion]) -> Value {
    Value::List(
        assertions
            .iter()
            .map(|a| {
                block(&[
                    ("source", (&a.source).into()),
                    ("property", (&a.property).into()),
                    ("comparison", (&a.comparison).into()),
                    ("value", assertion_value(&a.value).into()),
                ])
            })
            .collect(),
    )
}

// ============================================================================
// Step auth
// ============================================================================

/// At most one auth block is allowed; none means no auth
pub fn expand_auth(blocks: &[Block<'_>]) -> Result<Option<StepAuth>> {
    let Some(b) = blocks.first() else {
        return Ok(None);
    };
    Ok(Some(StepAuth {
        username: b.string("username")?,
        auth_type: b.string("auth_type")?,
        password: b.string("password")?,
    }))
}

pub fn flatten_auth(auth: Option<&StepAuth>) -> Value {
    let blocks = auth
        .filter(|a| *a != &StepAuth::default())
        .map(|a| {
            block(&[
                ("username", (&a.username).into()),
                ("auth_type", (&a.auth_type).into()),
                ("password", (&a.password).into()),
            ])
        });
    Value::set(blocks)
}

// ============================================================================
// Environment settings
// ============================================================================

pub fn expand_integrations(ids: Vec<String>) -> Vec<EnvironmentIntegration> {
    ids.into_iter()
        .map(|id| EnvironmentIntegration {
            id,
            ..EnvironmentIntegration::default()
        })
        .collect()
}

/// Only the ids are kept; type and description belong to the integration itself
pub fn flatten_integrations(integrations: &[EnvironmentIntegration]) -> Value {
    Value::string_set(integrations.iter().map(|i| i.id.as_str()))
}

pub fn expand_remote_agents(blocks: &[Block<'_>]) -> Result<Vec<RemoteAgent>> {
    blocks
        .iter()
        .map(|b| {
            Ok(RemoteAgent {
                name: b.string("name")?,
                uuid: b.string("uuid")?,
            })
        })
        .collect()
}

pub fn flatten_remote_agents(agents: &[RemoteAgent]) -> Value {
    Value::set(
        agents
            .iter()
            .map(|a| block(&[("name", (&a.name).into()), ("uuid", (&a.uuid).into())])),
    )
}

pub fn expand_emails(blocks: &[Block<'_>]) -> Result<Option<EmailSettings>> {
    let Some(b) = blocks.first() else {
        return Ok(None);
    };

    let recipients = b
        .get_blocks("recipients")?
        .iter()
        .map(|r| {
            Ok(Contact {
                id: r.string("id")?,
                name: r.string("name")?,
                email: r.string("email")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(EmailSettings {
        notify_all: b.get_bool("notify_all")?,
        notify_on: b.string("notify_on")?,
        notify_threshold: b.get_int("notify_threshold")?,
        recipients,
    }))
}

pub fn flatten_emails(emails: Option<&EmailSettings>) -> Value {
    let Some(e) = emails else {
        return Value::List(vec![]);
    };

    let recipients = e
        .recipients
        .iter()
        .map(|c| {
            block(&[
                ("id", (&c.id).into()),
                ("name", (&c.name).into()),
                ("email", (&c.email).into()),
            ])
        })
        .collect();

    Value::List(vec![block(&[
        ("notify_all", e.notify_all.into()),
        ("notify_on", (&e.notify_on).into()),
        ("notify_threshold", e.notify_threshold.into()),
        ("recipients", Value::List(recipients)),
    ])])
}

pub fn flatten_string_map(map: &BTreeMap<String, String>) -> Value {
    Value::string_map(map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Attributes, ResourceData};

    fn data_with(key: &str, value: Value) -> ResourceData {
        let mut data = ResourceData::new(Attributes::new());
        data.set(key, value);
        data
    }

    fn header(name: &str, value: &str) -> Value {
        block(&[("header", name.into()), ("value", value.into())])
    }

    #[test]
    fn test_headers_round_trip() {
        let pairs = vec![header("A", "1"), header("A", "2")];
        let data = data_with("headers", Value::List(pairs.clone()));

        let headers = expand_headers(&data.get_blocks("headers").unwrap()).unwrap();
        assert_eq!(
            headers,
            BTreeMap::from([("A".to_string(), vec!["1".to_string(), "2".to_string()])])
        );

        assert_eq!(flatten_headers(&headers), pairs);
    }

    #[test]
    fn test_headers_keep_order_within_key() {
        let data = data_with(
            "headers",
            Value::List(vec![
                header("Accept", "text/plain"),
                header("X-Trace", "on"),
                header("Accept", "application/json"),
            ]),
        );
        let headers = expand_headers(&data.get_blocks("headers").unwrap()).unwrap();
        assert_eq!(headers["Accept"], vec!["text/plain", "application/json"]);
        assert_eq!(headers["X-Trace"], vec!["on"]);
    }

    #[test]
    fn test_assertions_value_handling() {
        let data = data_with(
            "assertions",
            Value::List(vec![
                block(&[
                    ("source", "response_status".into()),
                    ("comparison", "equal_number".into()),
                    ("value", "200".into()),
                ]),
                block(&[
                    ("source", "response_json".into()),
                    ("comparison", "not_empty".into()),
                ]),
            ]),
        );
        let assertions = expand_assertions(&data.get_blocks("assertions").unwrap()).unwrap();
        assert_eq!(assertions[0].value, serde_json::json!("200"));
        assert!(assertions[1].value.is_null());

        let numeric = Assertion {
            source: "response_status".into(),
            comparison: "equal_number".into(),
            value: serde_json::json!(200),
            ..Assertion::default()
        };
        let flattened = flatten_assertions(&[numeric]);
        let items = flattened.as_items().unwrap();
        assert_eq!(items[0].as_map().unwrap()["value"], Value::from("200"));
    }

    #[test]
    fn test_auth_absent_and_present() {
        let empty = data_with("auth", Value::Set(vec![]));
        assert_eq!(expand_auth(&empty.get_blocks("auth").unwrap()).unwrap(), None);
        assert_eq!(flatten_auth(None), Value::Set(vec![]));

        let data = data_with(
            "auth",
            Value::set([block(&[
                ("username", "u".into()),
                ("auth_type", "basic".into()),
                ("password", "p".into()),
            ])]),
        );
        let auth = expand_auth(&data.get_blocks("auth").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(auth.auth_type, "basic");
        assert_eq!(flatten_auth(Some(&auth)), data.get("auth").cloned().unwrap());
    }

    #[test]
    fn test_emails() {
        let data = data_with(
            "emails",
            Value::List(vec![block(&[
                ("notify_all", true.into()),
                ("notify_on", "all".into()),
                ("notify_threshold", 3_i64.into()),
                (
                    "recipients",
                    Value::List(vec![block(&[
                        ("id", "c1".into()),
                        ("name", "Ops".into()),
                        ("email", "ops@example.com".into()),
                    ])]),
                ),
            ])]),
        );
        let emails = expand_emails(&data.get_blocks("emails").unwrap())
            .unwrap()
            .unwrap();
        assert!(emails.notify_all);
        assert_eq!(emails.notify_threshold, 3);
        assert_eq!(emails.recipients[0].email, "ops@example.com");

        assert_eq!(flatten_emails(Some(&emails)), data.get("emails").cloned().unwrap());
        assert_eq!(flatten_emails(None), Value::List(vec![]));
    }

    #[test]
    fn test_integrations_flatten_to_ids() {
        let integrations = vec![
            EnvironmentIntegration {
                id: "i2".into(),
                integration_type: "slack".into(),
                description: "alerts".into(),
            },
            EnvironmentIntegration {
                id: "i1".into(),
                ..EnvironmentIntegration::default()
            },
        ];
        assert_eq!(
            flatten_integrations(&integrations),
            Value::string_set(["i1", "i2"])
        );
        assert_eq!(expand_integrations(vec!["i1".into()])[0].id, "i1");
    }
}
