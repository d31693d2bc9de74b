use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, instrument};

use crm_sync_client::{take_records, Record, Transport};

use super::{fields_param, resource_path};
use crate::error::{Error, ErrorKind, Result};
use crate::query::{contact_email_query, lead_email_query};
use crate::search::SearchOptions;
use crate::CUSTOM_FIELD_PREFIX;

impl<T: Transport> super::CloseClient<T> {
    /// Id of the organization the API key belongs to.
    ///
    /// Resolved from `me/` on first use and cached for the client's
    /// lifetime.
    pub async fn organization_id(&self) -> Result<&str> {
        let id = self
            .organization_id
            .get_or_try_init(|| async {
                let me = self
                    .get_record("me/", &[fields_param(&["organizations"])])
                    .await?;
                let id = me
                    .get("organizations")
                    .and_then(Value::as_array)
                    .and_then(|orgs| orgs.first())
                    .and_then(|org| org.get("id"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::new(ErrorKind::NotFound(
                            "the API key is not a member of any organization".to_string(),
                        ))
                    })?;
                debug!(organization_id = id, "Resolved organization");
                Ok::<_, Error>(id.to_string())
            })
            .await?;
        Ok(id.as_str())
    }

    async fn organization_list(&self, key: &str) -> Result<Vec<Record>> {
        let id = self.organization_id().await?;
        let organization = self
            .get_record(&resource_path("organization", id), &[fields_param(&[key])])
            .await?;
        take_records(&organization, key).map_err(Into::into)
    }

    /// Lead statuses of the organization.
    #[instrument(skip(self))]
    pub async fn lead_statuses(&self) -> Result<Vec<Record>> {
        self.organization_list("lead_statuses").await
    }

    /// Opportunity pipelines, each with its `statuses`.
    #[instrument(skip(self))]
    pub async fn opportunity_pipelines(&self) -> Result<Vec<Record>> {
        self.organization_list("pipelines").await
    }

    /// Opportunity statuses of every pipeline, pipeline by pipeline.
    #[instrument(skip(self))]
    pub async fn opportunity_statuses(&self) -> Result<Vec<Record>> {
        let mut statuses = Vec::new();
        for pipeline in self.opportunity_pipelines().await? {
            statuses.extend(take_records(&pipeline, "statuses")?);
        }
        Ok(statuses)
    }

    /// Custom field schema of an object type (`lead`, `contact`,
    /// `opportunity`, `activity/<custom activity type id>`, ...).
    #[instrument(skip(self))]
    pub async fn custom_fields(&self, object_type: &str) -> Result<Vec<Record>> {
        let schema = self
            .get_record(&format!("custom_field_schema/{}/", object_type), &[])
            .await?;
        take_records(&schema, "fields").map_err(Into::into)
    }

    async fn custom_field_names(&self, object_type: &str) -> Result<Vec<(String, String)>> {
        let fields = self
            .get_all(
                &format!("custom_field/{}/", object_type),
                &[fields_param(&["id", "name"])],
            )
            .await?;
        Ok(fields
            .iter()
            .filter_map(|field| {
                let id = field.get("id")?.as_str()?;
                let name = field.get("name")?.as_str()?;
                Some((name.to_string(), id.to_string()))
            })
            .collect())
    }

    /// Id of the custom field named `name`, compared case-insensitively.
    #[instrument(skip(self))]
    pub async fn custom_field_id(&self, object_type: &str, name: &str) -> Result<Option<String>> {
        let wanted = name.to_lowercase();
        Ok(self
            .custom_field_names(object_type)
            .await?
            .into_iter()
            .find(|(field_name, _)| field_name.to_lowercase() == wanted)
            .map(|(_, id)| id))
    }

    /// Custom field name to record key (`custom.<id>`), ready to use in a
    /// payload.
    #[instrument(skip(self))]
    pub async fn custom_field_keys(&self, object_type: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .custom_field_names(object_type)
            .await?
            .into_iter()
            .map(|(name, id)| (name, format!("{}{}", CUSTOM_FIELD_PREFIX, id)))
            .collect())
    }

    /// Id of the custom activity type named `name`, compared
    /// case-insensitively.
    #[instrument(skip(self))]
    pub async fn custom_activity_type_id(&self, name: &str) -> Result<Option<String>> {
        let wanted = name.to_lowercase();
        let types = self
            .get_all("custom_activity/", &[fields_param(&["id", "name"])])
            .await?;
        Ok(types.iter().find_map(|activity_type| {
            let type_name = activity_type.get("name")?.as_str()?;
            if type_name.to_lowercase() != wanted {
                return None;
            }
            activity_type.get("id")?.as_str().map(str::to_string)
        }))
    }

    /// User email to user id.
    #[instrument(skip(self))]
    pub async fn user_ids_by_email(&self) -> Result<HashMap<String, String>> {
        let users = self.get_all("user/", &[fields_param(&["id", "email"])]).await?;
        Ok(users
            .iter()
            .filter_map(|user| {
                let email = user.get("email")?.as_str()?;
                let id = user.get("id")?.as_str()?;
                Some((email.to_string(), id.to_string()))
            })
            .collect())
    }

    /// Ids of every member of every group whose name starts with `prefix`
    /// (all groups when `None`).
    #[instrument(skip(self))]
    pub async fn user_ids_by_group(&self, prefix: Option<&str>) -> Result<HashSet<String>> {
        let groups = self.get_record("group/", &[fields_param(&["id", "name"])]).await?;
        let groups = take_records(&groups, "data")?;

        let mut user_ids = HashSet::new();
        for group in &groups {
            let name = group.get("name").and_then(Value::as_str).unwrap_or_default();
            if prefix.is_some_and(|prefix| !name.starts_with(prefix)) {
                continue;
            }
            let Some(id) = group.get("id").and_then(Value::as_str) else {
                continue;
            };

            let detail = self
                .get_record(
                    &resource_path("group", id),
                    &[fields_param(&["id", "name", "members"])],
                )
                .await?;
            user_ids.extend(
                take_records(&detail, "members")?
                    .iter()
                    .filter_map(|member| member.get("user_id")?.as_str().map(str::to_string)),
            );
        }
        Ok(user_ids)
    }

    /// Leads with a contact whose email is `email`.
    pub async fn search_leads_by_email(
        &self,
        email: &str,
        results_limit: Option<u32>,
    ) -> Result<Vec<Record>> {
        let mut options = SearchOptions::default();
        options.results_limit = results_limit;
        self.search(&lead_email_query(email), options).await
    }

    /// First lead with a contact whose email is `email`.
    pub async fn find_lead_by_email(
        &self,
        email: &str,
        fields: Option<&[&str]>,
    ) -> Result<Option<Record>> {
        let mut options = SearchOptions::default().with_results_limit(1);
        if let Some(fields) = fields {
            options = options.with_fields(fields.iter().copied());
        }
        let leads = self.search(&lead_email_query(email), options).await?;
        Ok(leads.into_iter().next())
    }

    /// First contact with the email address `email`.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<Record>> {
        let options = SearchOptions::for_object("contact")
            .with_fields(["id", "emails"])
            .with_results_limit(1);
        let contacts = self.search(&contact_email_query(email), options).await?;
        Ok(contacts.into_iter().next())
    }

    /// Whether any lead has a contact with this email address.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.count(&lead_email_query(email), None).await? > 0)
    }

    /// Update fields of one opportunity and return it.
    #[instrument(skip(self, data))]
    pub async fn update_opportunity(&self, id: &str, data: Value) -> Result<Record> {
        let endpoint = resource_path("opportunity", id);
        let updated = self.put(&endpoint, data).await?;
        super::into_record(updated, &endpoint)
    }
}
