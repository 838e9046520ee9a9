use std::sync::Arc;

use moka::future::Cache;
use qedi_chain::ChainClient;
use qedi_chain::types::{ObjectData, Owner};
use qedi_structs::contract::ContractCoordinates;
use qedi_structs::profile::{Link, LinkIcon, Profile};
use qedi_structs::username::Username;
use qedi_structs::{ObjectId, QediError, SuiAddress};
use serde_json::{Value, json};

/// Key type of the username registry's dynamic fields.
pub const DEFAULT_REGISTRY_KEY_TYPE: &str = "0x1::string::String";

/// Resolves usernames and owners to profiles.
#[derive(Clone)]
pub struct ProfileReader {
    chain: ChainClient,
    contract: ContractCoordinates,
    registry_key_type: Arc<str>,
    // Profiles are never deleted, so a resolved mapping stays valid.
    usernames: Cache<Username, ObjectId>,
}

impl ProfileReader {
    pub fn new(chain: ChainClient, contract: ContractCoordinates) -> Self {
        Self {
            chain,
            contract,
            registry_key_type: DEFAULT_REGISTRY_KEY_TYPE.into(),
            usernames: Cache::builder().max_capacity(10_000).build(),
        }
    }

    pub fn with_registry_key_type(mut self, key_type: &str) -> Self {
        self.registry_key_type = key_type.into();
        self
    }

    /// Look a profile up by username. `None` when the name is unknown, or
    /// when the registry cannot be read at all.
    pub async fn by_username(&self, username: &str) -> Result<Option<Profile>, QediError> {
        let Ok(username) = Username::parse(username) else {
            return Ok(None);
        };
        let Some(id) = self.lookup_username(&username).await else {
            return Ok(None);
        };
        self.by_id(id).await
    }

    async fn lookup_username(&self, username: &Username) -> Option<ObjectId> {
        if let Some(id) = self.usernames.get(username).await {
            return Some(id);
        }
        let field = self
            .chain
            .get_dynamic_field_object(
                self.contract.registry_id,
                &self.registry_key_type,
                json!(username.as_str()),
            )
            .await;
        let field = match field {
            Ok(Some(field)) => field,
            Ok(None) => {
                tracing::debug!(%username, "username not registered");
                return None;
            }
            Err(err) => {
                tracing::warn!(%username, error = %err, "username registry unreadable");
                return None;
            }
        };
        let id = field.fields().and_then(|f| f.get("value")).and_then(object_id_value);
        match id {
            Some(id) => {
                self.usernames.insert(username.clone(), id).await;
                Some(id)
            }
            None => {
                tracing::warn!(%username, "registry entry has no profile id");
                None
            }
        }
    }

    pub async fn by_id(&self, id: ObjectId) -> Result<Option<Profile>, QediError> {
        let Some(object) = self.chain.get_object(id).await? else {
            return Ok(None);
        };
        flatten_profile(&object)
            .map(Some)
            .map_err(|err| QediError::chain("unreadable profile object", err))
    }

    /// Every profile `owner` holds, newest first. Objects that do not parse
    /// as profiles are skipped.
    pub async fn by_owner(&self, owner: SuiAddress) -> Result<Vec<Profile>, QediError> {
        let objects = self
            .chain
            .get_owned_objects(owner, &self.contract.profile_type())
            .await?;
        let mut profiles: Vec<Profile> = objects
            .iter()
            .filter_map(|object| match flatten_profile(object) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    tracing::warn!(object = %object.object_id.abbreviated(), error = %err, "skipping unreadable profile");
                    None
                }
            })
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(profiles)
    }
}

/// Strip `{type, fields}` wrappers until plain data remains.
fn unwrap_fields(value: &Value) -> &Value {
    let mut current = value;
    while let Some(inner) = current.get("fields") {
        current = inner;
    }
    current
}

fn field<'a>(fields: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| fields.get(*name))
}

fn text(fields: &Value, names: &[&str]) -> String {
    field(fields, names)
        .map(unwrap_fields)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// u64s arrive as strings or numbers depending on the node.
fn number(fields: &Value, names: &[&str]) -> u64 {
    match field(fields, names).map(unwrap_fields) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => 0,
    }
}

/// An id rendered either as a bare string or as `{id: ...}`.
fn object_id_value(value: &Value) -> Option<ObjectId> {
    match unwrap_fields(value) {
        Value::String(s) => ObjectId::parse(s).ok(),
        Value::Object(map) => map.get("id").and_then(object_id_value),
        _ => None,
    }
}

fn flatten_link(value: &Value) -> Link {
    let fields = unwrap_fields(value);
    Link {
        title: text(fields, &["title", "label"]),
        url: text(fields, &["url"]),
        icon: LinkIcon::parse_lenient(&text(fields, &["icon"])),
        click_count: number(fields, &["click_count", "clicks"]),
    }
}

/// Turn the node's generic object rendering into a [`Profile`].
pub fn flatten_profile(object: &ObjectData) -> Result<Profile, String> {
    let fields = object
        .fields()
        .map(unwrap_fields)
        .ok_or_else(|| "object has no move content".to_string())?;
    let username = text(fields, &["username"]);
    let username = Username::parse(&username).map_err(|err| err.to_string())?;
    let links = match field(fields, &["links"]).map(unwrap_fields) {
        Some(Value::Array(items)) => items.iter().map(flatten_link).collect(),
        // Some node versions render vectors of structs as `{contents: [..]}`.
        Some(Value::Object(map)) => map
            .get("contents")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(flatten_link).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    let owner = match &object.owner {
        Some(Owner::AddressOwner(address)) => Some(*address),
        _ => field(fields, &["owner"])
            .and_then(Value::as_str)
            .and_then(|s| SuiAddress::parse(s).ok()),
    };
    Ok(Profile {
        id: object.object_id,
        owner,
        username,
        display_name: text(fields, &["display_name"]),
        bio: text(fields, &["bio"]),
        avatar_url: text(fields, &["avatar_url", "avatar_blob_id"]),
        theme: text(fields, &["theme"]),
        links,
        total_clicks: number(fields, &["total_clicks"]),
        created_at: number(fields, &["created_at"]),
        updated_at: number(fields, &["updated_at"]),
    })
}
