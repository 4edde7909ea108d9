#![forbid(unsafe_code)]

use serde_json::{json, Value};
use url::form_urlencoded;

use crate::{ContractViolation, LanternYear, ObjectId, Validate};

pub const NOREFRESH_VALUE: &str = "True";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const MUTATION_PARAM_MAX_LEN: usize = 4_096;

/// Rejects a single posted key or value longer than `MUTATION_PARAM_MAX_LEN`.
pub fn check_param_len(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if value.len() > MUTATION_PARAM_MAX_LEN {
        return Err(ContractViolation::InvalidRange {
            field,
            min: 0,
            max: MUTATION_PARAM_MAX_LEN as i64,
            got: i64::try_from(value.len()).unwrap_or(i64::MAX),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Settlement,
    Survivor,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settlement => "settlement",
            Self::Survivor => "survivor",
        }
    }
}

/// `POST /` with `modify={collection}&asset_id={id}&...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMutation {
    pub collection: Collection,
    pub asset_id: ObjectId,
    pub params: Vec<(String, String)>,
    pub norefresh: bool,
}

impl FormMutation {
    pub fn v1(
        collection: Collection,
        asset_id: ObjectId,
        params: Vec<(String, String)>,
    ) -> Result<Self, ContractViolation> {
        let m = Self {
            collection,
            asset_id,
            params,
            norefresh: true,
        };
        m.validate()?;
        Ok(m)
    }

    fn single(
        collection: Collection,
        asset_id: &ObjectId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            collection,
            asset_id.clone(),
            vec![(key.into(), value.into())],
        )
    }

    /// Note and epithet posts never carried the `norefresh` flag.
    fn without_norefresh(mut self) -> Self {
        self.norefresh = false;
        self
    }

    pub fn set_lantern_year(
        settlement_id: &ObjectId,
        year: LanternYear,
    ) -> Result<Self, ContractViolation> {
        Self::single(
            Collection::Settlement,
            settlement_id,
            "lantern_year",
            year.to_string(),
        )
    }

    pub fn add_timeline_event(
        settlement_id: &ObjectId,
        year: LanternYear,
        event_handle: &str,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            settlement_id.clone(),
            vec![
                ("update_timeline".to_string(), "add".to_string()),
                ("timeline_update_ly".to_string(), year.to_string()),
                (
                    "timeline_update_event_handle".to_string(),
                    event_handle.to_string(),
                ),
            ],
        )
    }

    /// Generic `name=value` update used by sheet inputs and step controls.
    pub fn field_value(
        collection: Collection,
        asset_id: &ObjectId,
        name: &str,
        value: &str,
    ) -> Result<Self, ContractViolation> {
        Self::single(collection, asset_id, name, value)
    }

    pub fn attribute_controller_update(
        survivor_id: &ObjectId,
        attribute: &str,
        attribute_type: &str,
        value: i64,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Survivor,
            survivor_id.clone(),
            vec![
                ("angularjs_attrib_update".to_string(), attribute.to_string()),
                (
                    "angularjs_attrib_type".to_string(),
                    attribute_type.to_string(),
                ),
                ("angularjs_attrib_value".to_string(), value.to_string()),
            ],
        )
    }

    pub fn add_survivor_note(
        survivor_id: &ObjectId,
        note: &str,
    ) -> Result<Self, ContractViolation> {
        Ok(Self::single(Collection::Survivor, survivor_id, "add_survivor_note", note)?
            .without_norefresh())
    }

    pub fn rm_survivor_note(survivor_id: &ObjectId, note: &str) -> Result<Self, ContractViolation> {
        Ok(Self::single(Collection::Survivor, survivor_id, "rm_survivor_note", note)?
            .without_norefresh())
    }

    pub fn add_epithet(survivor_id: &ObjectId, epithet: &str) -> Result<Self, ContractViolation> {
        Ok(Self::single(Collection::Survivor, survivor_id, "add_epithet", epithet)?
            .without_norefresh())
    }

    pub fn remove_epithet(
        survivor_id: &ObjectId,
        epithet: &str,
    ) -> Result<Self, ContractViolation> {
        Ok(Self::single(Collection::Survivor, survivor_id, "remove_epithet", epithet)?
            .without_norefresh())
    }

    pub fn toggle_damage(survivor_id: &ObjectId, box_name: &str) -> Result<Self, ContractViolation> {
        Self::single(Collection::Survivor, survivor_id, box_name, "checked")
    }

    pub fn remove_settlement_asset(
        settlement_id: &ObjectId,
        group: &str,
        item_name: &str,
    ) -> Result<Self, ContractViolation> {
        Self::single(
            Collection::Settlement,
            settlement_id,
            format!("remove_{group}"),
            item_name,
        )
    }

    pub fn encode_body(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("modify", self.collection.as_str());
        form.append_pair("asset_id", self.asset_id.as_str());
        for (k, v) in &self.params {
            form.append_pair(k, v);
        }
        if self.norefresh {
            form.append_pair("norefresh", NOREFRESH_VALUE);
        }
        form.finish()
    }
}

impl Validate for FormMutation {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.asset_id.validate()?;
        if self.params.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "form_mutation.params",
                reason: "must contain at least one field",
            });
        }
        for (k, v) in &self.params {
            if k.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "form_mutation.params.key",
                    reason: "must not be empty",
                });
            }
            if matches!(k.as_str(), "modify" | "asset_id" | "norefresh") {
                return Err(ContractViolation::InvalidValue {
                    field: "form_mutation.params.key",
                    reason: "must not shadow modify, asset_id or norefresh",
                });
            }
            check_param_len("form_mutation.params.key", k)?;
            check_param_len("form_mutation.params.value", v)?;
        }
        Ok(())
    }
}

/// JSON post to `{api}{collection}/{action}/{asset_id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiMutation {
    pub collection: Collection,
    pub action: String,
    pub asset_id: ObjectId,
    pub body: Value,
}

impl ApiMutation {
    pub fn v1(
        collection: Collection,
        action: &str,
        asset_id: ObjectId,
        body: Value,
    ) -> Result<Self, ContractViolation> {
        let m = Self {
            collection,
            action: action.to_string(),
            asset_id,
            body,
        };
        m.validate()?;
        Ok(m)
    }

    pub fn update_endeavor_tokens(
        settlement_id: &ObjectId,
        modifier: i64,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            "update_endeavor_tokens",
            settlement_id.clone(),
            json!({ "modifier": modifier }),
        )
    }

    pub fn set_status_flag(
        survivor_id: &ObjectId,
        flag: &str,
        unset: bool,
    ) -> Result<Self, ContractViolation> {
        let body = if unset {
            json!({ "flag": flag, "unset": true })
        } else {
            json!({ "flag": flag })
        };
        Self::v1(
            Collection::Survivor,
            "set_status_flag",
            survivor_id.clone(),
            body,
        )
    }

    pub fn update_attribute(
        survivor_id: &ObjectId,
        attribute: &str,
        modifier: i64,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Survivor,
            "update_attribute",
            survivor_id.clone(),
            json!({ "attribute": attribute, "modifier": modifier }),
        )
    }

    pub fn set_showdown_type(
        settlement_id: &ObjectId,
        showdown_type: &str,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            "set_showdown_type",
            settlement_id.clone(),
            json!({ "showdown_type": showdown_type }),
        )
    }

    pub fn set_current_quarry(
        settlement_id: &ObjectId,
        quarry: &str,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            "set_current_quarry",
            settlement_id.clone(),
            json!({ "current_quarry": quarry }),
        )
    }

    pub fn return_survivors(
        settlement_id: &ObjectId,
        aftermath: &str,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            "return_survivors",
            settlement_id.clone(),
            json!({ "aftermath": aftermath }),
        )
    }

    pub fn update_departing_survivors(
        settlement_id: &ObjectId,
        attribute: &str,
        modifier: i64,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            Collection::Settlement,
            "update_survivors",
            settlement_id.clone(),
            json!({ "include": "departing", "attribute": attribute, "modifier": modifier }),
        )
    }

    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.collection.as_str(),
            self.action,
            self.asset_id.as_str()
        )
    }
}

impl Validate for ApiMutation {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.asset_id.validate()?;
        if self.action.is_empty()
            || !self
                .action
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "api_mutation.action",
                reason: "must be non-empty [a-z0-9_]",
            });
        }
        if !self.body.is_object() {
            return Err(ContractViolation::InvalidValue {
                field: "api_mutation.body",
                reason: "must be a JSON object",
            });
        }
        Ok(())
    }
}

/// `POST /` with `update_user_preferences=True&norefresh=True&{name}={value}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceMutation {
    pub name: String,
    pub value: String,
}

impl PreferenceMutation {
    pub fn v1(name: &str, value: &str) -> Result<Self, ContractViolation> {
        let m = Self {
            name: name.to_string(),
            value: value.to_string(),
        };
        m.validate()?;
        Ok(m)
    }

    pub fn encode_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("update_user_preferences", NOREFRESH_VALUE)
            .append_pair("norefresh", NOREFRESH_VALUE)
            .append_pair(&self.name, &self.value)
            .finish()
    }
}

impl Validate for PreferenceMutation {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "preference_mutation.name",
                reason: "must not be empty",
            });
        }
        check_param_len("preference_mutation.value", &self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Form(FormMutation),
    Api(ApiMutation),
    Preferences(PreferenceMutation),
}

impl MutationRequest {
    /// Short label for logs: `settlement:update_timeline`, `survivor/set_status_flag`, ...
    pub fn describe(&self) -> String {
        match self {
            Self::Form(m) => format!(
                "{}:{}",
                m.collection.as_str(),
                m.params.first().map(|(k, _)| k.as_str()).unwrap_or("")
            ),
            Self::Api(m) => format!("{}/{}", m.collection.as_str(), m.action),
            Self::Preferences(m) => format!("preferences:{}", m.name),
        }
    }
}

impl From<FormMutation> for MutationRequest {
    fn from(m: FormMutation) -> Self {
        Self::Form(m)
    }
}

impl From<ApiMutation> for MutationRequest {
    fn from(m: ApiMutation) -> Self {
        Self::Api(m)
    }
}

impl From<PreferenceMutation> for MutationRequest {
    fn from(m: PreferenceMutation) -> Self {
        Self::Preferences(m)
    }
}

impl Validate for MutationRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Self::Form(m) => m.validate(),
            Self::Api(m) => m.validate(),
            Self::Preferences(m) => m.validate(),
        }
    }
}
