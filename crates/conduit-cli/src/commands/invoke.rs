//! `conduit invoke` command implementation.

use anyhow::{Context, Result, bail};
use conduit_core::Claims;
use conduit_runtime::Gateway;
use serde_json::{Map, Value};

/// Parse `--params` into an argument object.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--params is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--params must be a JSON object, got {other}"),
    }
}

fn parse_claims(raw: &str) -> Result<Claims> {
    serde_json::from_str(raw).context("--claims must map auth service names to claim objects")
}

pub async fn run(
    gateway: &Gateway,
    tool: &str,
    params: &str,
    auth_services: &[String],
    claims: &str,
) -> Result<()> {
    let data = parse_arguments(params)?;
    let claims = parse_claims(claims)?;

    let result = gateway
        .invoke(tool, &data, &claims, auth_services)
        .await
        .with_context(|| format!("invoking tool \"{tool}\""))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments_requires_an_object() {
        assert_eq!(parse_arguments(r#"{"id": 1}"#).unwrap()["id"], 1);
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{").is_err());
    }

    #[test]
    fn test_parse_claims_by_service() {
        let claims = parse_claims(r#"{"google": {"email": "a@b.c"}}"#).unwrap();

        assert_eq!(claims["google"]["email"], "a@b.c");
        assert!(parse_claims(r#"{"google": "a@b.c"}"#).is_err());
    }
}
