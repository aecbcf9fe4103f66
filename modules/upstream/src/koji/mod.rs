//! Client for the downstream Koji build system hub.

mod mock;
pub mod xmlrpc;

pub use mock::Mock;

use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use xmlrpc::Value;

const USER_AGENT: &str = "apollo/koji/0.2";

/// Marker for module build service metadata on a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeInfo;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildExtra {
    pub typeinfo: Option<TypeInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Build {
    pub build_id: i64,
    pub package_name: String,
    pub version: String,
    pub release: String,
    pub epoch: Option<i64>,
    pub extra: Option<BuildExtra>,
}

impl Build {
    /// Module content inserted by the module build service carries typeinfo
    /// metadata and never represents a real package build.
    pub fn is_module_content(&self) -> bool {
        self.extra
            .as_ref()
            .map(|extra| extra.typeinfo.is_some())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rpm {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub epoch: Option<i64>,
    pub build_id: i64,
}

#[async_trait]
pub trait BuildSystem: Send + Sync {
    async fn get_package_id(&self, name: &str) -> Result<i64, Error>;
    async fn list_tagged(&self, tag: &str, package: &str) -> Result<Vec<Build>, Error>;
    async fn list_builds(&self, package_id: i64) -> Result<Vec<Build>, Error>;
    async fn list_rpms(&self, build_id: i64) -> Result<Vec<Rpm>, Error>;
}

pub struct Client {
    http: reqwest::Client,
    endpoint: String,
}

impl Client {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, Error> {
        let body = xmlrpc::write_request(method, &params);
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        xmlrpc::parse_response(&response)
    }
}

/// Keyword arguments are passed as a trailing struct with the `__starstar`
/// marker the hub recognizes.
fn kwargs<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    let mut members: HashMap<String, Value> = pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    members.insert("__starstar".to_string(), Value::Bool(true));
    Value::Struct(members)
}

fn field_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn field_i64(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn build_from(value: &Value) -> Result<Build, Error> {
    let extra = match value.get("extra") {
        None | Some(Value::Nil) => None,
        Some(extra) => Some(BuildExtra {
            typeinfo: match extra.get("typeinfo") {
                None | Some(Value::Nil) => None,
                Some(_) => Some(TypeInfo),
            },
        }),
    };

    Ok(Build {
        build_id: field_i64(value, "build_id")
            .ok_or_else(|| Error::Payload("build without build_id".to_string()))?,
        package_name: field_str(value, "package_name"),
        version: field_str(value, "version"),
        release: field_str(value, "release"),
        epoch: field_i64(value, "epoch"),
        extra,
    })
}

fn rpm_from(value: &Value) -> Result<Rpm, Error> {
    Ok(Rpm {
        name: field_str(value, "name"),
        arch: field_str(value, "arch"),
        version: field_str(value, "version"),
        release: field_str(value, "release"),
        epoch: field_i64(value, "epoch"),
        build_id: field_i64(value, "build_id")
            .ok_or_else(|| Error::Payload("rpm without build_id".to_string()))?,
    })
}

fn builds_from(value: Value) -> Result<Vec<Build>, Error> {
    value
        .as_array()
        .ok_or_else(|| Error::Payload("expected an array of builds".to_string()))?
        .iter()
        .map(build_from)
        .collect()
}

#[async_trait]
impl BuildSystem for Client {
    async fn get_package_id(&self, name: &str) -> Result<i64, Error> {
        let response = self
            .call("getPackageID", vec![Value::String(name.to_string())])
            .await?;

        response.as_i64().ok_or(Error::NotFound)
    }

    async fn list_tagged(&self, tag: &str, package: &str) -> Result<Vec<Build>, Error> {
        let response = self
            .call(
                "listTagged",
                vec![
                    Value::String(tag.to_string()),
                    kwargs([("package", Value::String(package.to_string()))]),
                ],
            )
            .await?;

        builds_from(response)
    }

    async fn list_builds(&self, package_id: i64) -> Result<Vec<Build>, Error> {
        let response = self
            .call("listBuilds", vec![kwargs([("packageID", Value::Int(package_id))])])
            .await?;

        builds_from(response)
    }

    async fn list_rpms(&self, build_id: i64) -> Result<Vec<Rpm>, Error> {
        let response = self
            .call("listRPMs", vec![kwargs([("buildID", Value::Int(build_id))])])
            .await?;

        response
            .as_array()
            .ok_or_else(|| Error::Payload("expected an array of rpms".to_string()))?
            .iter()
            .map(rpm_from)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn module_content_detection() {
        let plain = Build {
            build_id: 10,
            package_name: "cmake".to_string(),
            ..Default::default()
        };
        assert!(!plain.is_module_content());

        let module_content = Build {
            extra: Some(BuildExtra {
                typeinfo: Some(TypeInfo),
            }),
            ..plain.clone()
        };
        assert!(module_content.is_module_content());

        let empty_extra = Build {
            extra: Some(BuildExtra::default()),
            ..plain
        };
        assert!(!empty_extra.is_module_content());
    }

    #[test]
    fn build_from_struct_value() {
        let value = Value::Struct(
            [
                ("build_id".to_string(), Value::Int(10)),
                ("package_name".to_string(), Value::String("cmake".to_string())),
                ("version".to_string(), Value::String("3.18.2".to_string())),
                ("release".to_string(), Value::String("11.el8_4".to_string())),
                ("epoch".to_string(), Value::Nil),
                ("extra".to_string(), Value::Nil),
            ]
            .into_iter()
            .collect(),
        );

        let build = build_from(&value).unwrap();
        assert_eq!(build.build_id, 10);
        assert_eq!(build.package_name, "cmake");
        assert_eq!(build.epoch, None);
        assert!(build.extra.is_none());
    }
}
