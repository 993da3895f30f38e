//! Entity type builder (C3, §4.3) and the authorization middleware (C4,
//! §4.4) that every generated field resolver routes through.
//!
//! `define_entity!` builds one GraphQL object type per entity model: an
//! `id` field, the model's scalar columns, an object field per
//! single-reference relationship and a connection field per collection
//! relationship. Entities with derived fields (`visitor_geoloc`,
//! `opener_geoloc`, `has_expired`) splice extra hand-written resolvers
//! into the same `#[Object]` impl via the `extra` block, matching §4.3's
//! "entities with derived fields add explicit resolvers."

use std::sync::Arc;

use async_graphql::{Context, Object, Result as GqlResult, SimpleObject};

use crate::db::DbSession;
use crate::filter::FilterInput;
use crate::geoip::{GeoIpLookup, GeoLocation, from_ip_address};
use crate::model::{self, EntityModel, model_by_name};
use crate::pagination::Connection as RawConnection;
use crate::query::{
    Iterable, QuerySpec, relationship_query, resolve_connection, resolve_single_relationship,
};
use crate::scalar::DateTimeValue;
use crate::session::Session;
use crate::sort::SortInput;
use crate::value::{EntityRow, SqlValue};

/// An entity instance mid-flight: its reflected model plus the fetched
/// row. Every generated entity type is a thin named wrapper around one of
/// these so async-graphql can give each a distinct GraphQL type name.
#[derive(Clone)]
pub struct EntityObject {
    pub model: &'static EntityModel,
    pub row: EntityRow,
}

fn session_of<'a>(ctx: &'a Context<'_>) -> Option<&'a Arc<dyn Session>> {
    ctx.data_opt::<Arc<dyn Session>>()
}

/// C4, case 1/2/3: with no session the field resolves normally; with a
/// session that denies the field on this instance, it resolves to `None`
/// instead of invoking anything further.
pub async fn authorized<T>(
    ctx: &Context<'_>,
    model: &'static EntityModel,
    row: &EntityRow,
    field_name: &str,
    value: Option<T>,
) -> Option<T> {
    match session_of(ctx) {
        Some(session) if !session.may_read(model.name, field_name, Some(row)) => None,
        _ => value,
    }
}

/// The same instance-level check, used ahead of relationship resolution
/// (which has no plain value to short-circuit on).
fn instance_allowed(ctx: &Context<'_>, model: &'static EntityModel, row: &EntityRow, field_name: &str) -> bool {
    match session_of(ctx) {
        Some(session) => session.may_read(model.name, field_name, Some(row)),
        None => true,
    }
}

/// Implemented by every generated entity type so the `Database` root
/// object can construct them generically.
pub trait EntityWrapper: Sized {
    fn wrap(model: &'static EntityModel, row: EntityRow) -> Self;
}

/// Implemented by every generated `*Connection` type.
pub trait ConnectionWrapper: Sized {
    fn from_connection(conn: RawConnection<EntityRow>, model: &'static EntityModel) -> Self;
}

macro_rules! define_entity_connection {
    ($conn:ident, $edge:ident, $node:ident) => {
        #[derive(SimpleObject, Clone)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(SimpleObject, Clone)]
        pub struct $conn {
            pub edges: Vec<$edge>,
            pub page_info: crate::pagination::PageInfo,
            pub total: i64,
        }

        impl ConnectionWrapper for $conn {
            fn from_connection(conn: RawConnection<EntityRow>, model: &'static EntityModel) -> Self {
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: $node(EntityObject { model, row: e.node }),
                            cursor: e.cursor,
                        })
                        .collect(),
                    page_info: conn.page_info,
                    total: conn.total,
                }
            }
        }
    };
}

macro_rules! define_entity {
    (
        $struct_name:ident, $model:expr,
        text: [$($text_field:ident),* $(,)?],
        int: [$($int_field:ident),* $(,)?],
        real: [$($real_field:ident),* $(,)?],
        bool: [$($bool_field:ident),* $(,)?],
        datetime: [$($dt_field:ident),* $(,)?],
        single: [$(($single_field:ident, $single_ty:ident)),* $(,)?],
        collection: [$(($coll_field:ident, $coll_ty:ident, $coll_conn:ident)),* $(,)?],
        extra: { $($extra:item)* }
    ) => {
        #[derive(Clone)]
        pub struct $struct_name(pub EntityObject);

        impl EntityWrapper for $struct_name {
            fn wrap(model: &'static EntityModel, row: EntityRow) -> Self {
                Self(EntityObject { model, row })
            }
        }

        #[Object]
        impl $struct_name {
            async fn id(&self, ctx: &Context<'_>) -> Option<String> {
                let value = self.0.row.get("id").and_then(|v| v.as_string());
                authorized(ctx, $model, &self.0.row, "id", value).await
            }

            $(
                async fn $text_field(&self, ctx: &Context<'_>) -> Option<String> {
                    let value = self.0.row.get(stringify!($text_field)).and_then(|v| v.as_string());
                    authorized(ctx, $model, &self.0.row, stringify!($text_field), value).await
                }
            )*

            $(
                async fn $int_field(&self, ctx: &Context<'_>) -> Option<i64> {
                    let value = self.0.row.get(stringify!($int_field)).and_then(|v| v.as_i64());
                    authorized(ctx, $model, &self.0.row, stringify!($int_field), value).await
                }
            )*

            $(
                async fn $real_field(&self, ctx: &Context<'_>) -> Option<f64> {
                    let value = self.0.row.get(stringify!($real_field)).and_then(|v| v.as_f64());
                    authorized(ctx, $model, &self.0.row, stringify!($real_field), value).await
                }
            )*

            $(
                async fn $bool_field(&self, ctx: &Context<'_>) -> Option<bool> {
                    let value = self.0.row.get(stringify!($bool_field)).and_then(|v| v.as_bool());
                    authorized(ctx, $model, &self.0.row, stringify!($bool_field), value).await
                }
            )*

            $(
                async fn $dt_field(&self, ctx: &Context<'_>) -> Option<DateTimeValue> {
                    let value = self.0.row.get(stringify!($dt_field)).and_then(|v| v.as_datetime()).map(DateTimeValue);
                    authorized(ctx, $model, &self.0.row, stringify!($dt_field), value).await
                }
            )*

            $(
                async fn $single_field(&self, ctx: &Context<'_>) -> GqlResult<Option<$single_ty>> {
                    if !instance_allowed(ctx, $model, &self.0.row, stringify!($single_field)) {
                        return Ok(None);
                    }
                    let db = ctx.data::<Arc<dyn DbSession>>()?;
                    let row = resolve_single_relationship(db.as_ref(), $model, &self.0.row, stringify!($single_field)).await?;
                    Ok(row.map(|r| {
                        let target = model_by_name(stringify!($single_ty)).expect("registered entity");
                        $single_ty::wrap(target, r)
                    }))
                }
            )*

            $(
                async fn $coll_field(
                    &self,
                    ctx: &Context<'_>,
                    first: Option<i32>,
                    after: Option<String>,
                    last: Option<i32>,
                    before: Option<String>,
                    filter: Option<FilterInput>,
                    sort: Option<Vec<SortInput>>,
                ) -> GqlResult<Option<$coll_conn>> {
                    if !instance_allowed(ctx, $model, &self.0.row, stringify!($coll_field)) {
                        return Ok(None);
                    }
                    let Some(spec) = relationship_query($model, &self.0.row, stringify!($coll_field)) else {
                        return Ok(None);
                    };
                    let db = ctx.data::<Arc<dyn DbSession>>()?;
                    let session = session_of(ctx).map(|s| s.as_ref());
                    let target = spec.model;
                    let conn = resolve_connection(
                        db.as_ref(),
                        Iterable::LazyQuery(spec),
                        filter,
                        sort,
                        session,
                        first,
                        after,
                        last,
                        before,
                    )
                    .await?;
                    Ok(Some(<$coll_conn as ConnectionWrapper>::from_connection(conn, target)))
                }
            )*

            $($extra)*
        }
    };
}

define_entity_connection!(AlertSubscriptionConnection, AlertSubscriptionEdge, AlertSubscription);
define_entity_connection!(CampaignTypeConnection, CampaignTypeEdge, CampaignType);
define_entity_connection!(CompanyConnection, CompanyEdge, Company);
define_entity_connection!(CompanyDepartmentConnection, CompanyDepartmentEdge, CompanyDepartment);
define_entity_connection!(CredentialConnection, CredentialEdge, Credential);
define_entity_connection!(DeaddropConnectionConnection, DeaddropConnectionEdge, DeaddropConnection);
define_entity_connection!(DeaddropDeploymentConnection, DeaddropDeploymentEdge, DeaddropDeployment);
define_entity_connection!(IndustryConnection, IndustryEdge, Industry);
define_entity_connection!(LandingPageConnection, LandingPageEdge, LandingPage);
define_entity_connection!(MessageConnection, MessageEdge, Message);
define_entity_connection!(CampaignConnection, CampaignEdge, Campaign);
define_entity_connection!(UserConnection, UserEdge, User);
define_entity_connection!(VisitConnection, VisitEdge, Visit);

fn has_expired_value(row: &EntityRow, column: &str) -> Option<bool> {
    row.get(column).and_then(|v| v.as_datetime()).map(|dt| dt < chrono::Utc::now())
}

async fn geoloc_from_column(ctx: &Context<'_>, row: &EntityRow, ip_column: &str) -> GqlResult<Option<GeoLocation>> {
    let Some(ip) = row.get(ip_column).and_then(|v| v.as_string()) else {
        return Ok(None);
    };
    if ip.is_empty() {
        return Ok(None);
    }
    let lookup = ctx.data::<Arc<dyn GeoIpLookup>>()?;
    Ok(from_ip_address(lookup.as_ref(), &ip).await)
}

define_entity! {
    AlertSubscription, &model::ALERT_SUBSCRIPTION,
    text: [user_id, campaign_id],
    int: [],
    real: [],
    bool: [],
    datetime: [mute_timestamp, expiration],
    single: [(user, User), (campaign, Campaign)],
    collection: [],
    extra: {
        async fn has_expired(&self, ctx: &Context<'_>) -> Option<bool> {
            let value = has_expired_value(&self.0.row, "expiration");
            authorized(ctx, &model::ALERT_SUBSCRIPTION, &self.0.row, "has_expired", value).await
        }
    }
}

define_entity! {
    CampaignType, &model::CAMPAIGN_TYPE,
    text: [name],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [],
    collection: [(campaigns, Campaign, CampaignConnection)],
    extra: {}
}

define_entity! {
    Company, &model::COMPANY,
    text: [name, description, industry_id, url_main, url_email, url_remote_access],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [(industry, Industry)],
    collection: [(campaigns, Campaign, CampaignConnection)],
    extra: {}
}

define_entity! {
    CompanyDepartment, &model::COMPANY_DEPARTMENT,
    text: [name],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [],
    collection: [(messages, Message, MessageConnection)],
    extra: {}
}

define_entity! {
    Industry, &model::INDUSTRY,
    text: [name],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [],
    collection: [(companies, Company, CompanyConnection)],
    extra: {}
}

define_entity! {
    User, &model::USER,
    text: [name, phone_number, email_address],
    int: [],
    real: [],
    bool: [],
    datetime: [last_login, expiration],
    single: [],
    collection: [
        (alert_subscriptions, AlertSubscription, AlertSubscriptionConnection),
        (campaigns, Campaign, CampaignConnection),
    ],
    extra: {
        async fn has_expired(&self, ctx: &Context<'_>) -> Option<bool> {
            let value = has_expired_value(&self.0.row, "expiration");
            authorized(ctx, &model::USER, &self.0.row, "has_expired", value).await
        }
    }
}

define_entity! {
    Campaign, &model::CAMPAIGN,
    text: [name, description, user_id, campaign_type_id, company_id],
    int: [],
    real: [],
    bool: [reject_after_credentials],
    datetime: [created, expiration],
    single: [(user, User), (campaign_type, CampaignType), (company, Company)],
    collection: [
        (alert_subscriptions, AlertSubscription, AlertSubscriptionConnection),
        (credentials, Credential, CredentialConnection),
        (deaddrop_connections, DeaddropConnection, DeaddropConnectionConnection),
        (deaddrop_deployments, DeaddropDeployment, DeaddropDeploymentConnection),
        (landing_pages, LandingPage, LandingPageConnection),
        (messages, Message, MessageConnection),
        (visits, Visit, VisitConnection),
    ],
    extra: {
        async fn has_expired(&self, ctx: &Context<'_>) -> Option<bool> {
            let value = has_expired_value(&self.0.row, "expiration");
            authorized(ctx, &model::CAMPAIGN, &self.0.row, "has_expired", value).await
        }
    }
}

define_entity! {
    LandingPage, &model::LANDING_PAGE,
    text: [campaign_id, hostname, page],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [(campaign, Campaign)],
    collection: [(first_visits, Visit, VisitConnection)],
    extra: {}
}

define_entity! {
    Message, &model::MESSAGE,
    text: [campaign_id, company_department_id, target_email, first_name, last_name, opener_ip],
    int: [],
    real: [],
    bool: [trained],
    datetime: [opened, sent, reported],
    single: [(campaign, Campaign), (company_department, CompanyDepartment)],
    collection: [
        (credentials, Credential, CredentialConnection),
        (visits, Visit, VisitConnection),
    ],
    extra: {
        async fn opener_geoloc(&self, ctx: &Context<'_>) -> GqlResult<Option<GeoLocation>> {
            if !instance_allowed(ctx, &model::MESSAGE, &self.0.row, "opener_geoloc") {
                return Ok(None);
            }
            geoloc_from_column(ctx, &self.0.row, "opener_ip").await
        }
    }
}

define_entity! {
    Visit, &model::VISIT,
    text: [message_id, campaign_id, landing_page_id, ip, user_agent],
    int: [visit_count],
    real: [],
    bool: [],
    datetime: [first_seen, last_seen],
    single: [(message, Message), (campaign, Campaign), (landing_page, LandingPage)],
    collection: [(credentials, Credential, CredentialConnection)],
    extra: {
        async fn visitor_geoloc(&self, ctx: &Context<'_>) -> GqlResult<Option<GeoLocation>> {
            if !instance_allowed(ctx, &model::VISIT, &self.0.row, "visitor_geoloc") {
                return Ok(None);
            }
            geoloc_from_column(ctx, &self.0.row, "ip").await
        }
    }
}

define_entity! {
    Credential, &model::CREDENTIAL,
    text: [visit_id, message_id, campaign_id, username, password],
    int: [],
    real: [],
    bool: [],
    datetime: [submitted],
    single: [(visit, Visit), (message, Message), (campaign, Campaign)],
    collection: [],
    extra: {}
}

define_entity! {
    DeaddropDeployment, &model::DEADDROP_DEPLOYMENT,
    text: [campaign_id, destination],
    int: [],
    real: [],
    bool: [],
    datetime: [],
    single: [(campaign, Campaign)],
    collection: [(deaddrop_connections, DeaddropConnection, DeaddropConnectionConnection)],
    extra: {}
}

define_entity! {
    DeaddropConnection, &model::DEADDROP_CONNECTION,
    text: [deployment_id, campaign_id, visitor_id, ip, local_username, local_hostname],
    int: [visit_count],
    real: [],
    bool: [],
    datetime: [first_seen, last_seen],
    single: [(deployment, DeaddropDeployment), (campaign, Campaign)],
    collection: [],
    extra: {
        async fn visitor_geoloc(&self, ctx: &Context<'_>) -> GqlResult<Option<GeoLocation>> {
            if !instance_allowed(ctx, &model::DEADDROP_CONNECTION, &self.0.row, "visitor_geoloc") {
                return Ok(None);
            }
            geoloc_from_column(ctx, &self.0.row, "ip").await
        }
    }
}

/// The stateless `Database` root projection (§4.7): every entity as a
/// singular lookup and as a connection.
pub struct Database;

async fn lookup_single<T: EntityWrapper>(
    ctx: &Context<'_>,
    model: &'static EntityModel,
    equals: Vec<(&'static str, SqlValue)>,
) -> GqlResult<Option<T>> {
    let db = ctx.data::<Arc<dyn DbSession>>()?;
    let row = db.fetch_one_by_columns(model, &equals).await?;
    Ok(row.map(|r| T::wrap(model, r)))
}

#[allow(clippy::too_many_arguments)]
async fn root_connection<C: ConnectionWrapper>(
    ctx: &Context<'_>,
    model: &'static EntityModel,
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
    filter: Option<FilterInput>,
    sort: Option<Vec<SortInput>>,
) -> GqlResult<C> {
    let db = ctx.data::<Arc<dyn DbSession>>()?;
    let session = session_of(ctx).map(|s| s.as_ref());
    let conn = resolve_connection(
        db.as_ref(),
        Iterable::LazyQuery(QuerySpec::default_query(model)),
        filter,
        sort,
        session,
        first,
        after,
        last,
        before,
    )
    .await?;
    Ok(C::from_connection(conn, model))
}

macro_rules! root_field {
    ($name:ident, $ty:ident, $model:expr, [$($kwarg:ident),*]) => {
        async fn $name(&self, ctx: &Context<'_>, $($kwarg: Option<String>),*) -> GqlResult<Option<$ty>> {
            let mut equals = Vec::new();
            $(
                if let Some(v) = $kwarg {
                    equals.push((stringify!($kwarg), SqlValue::Text(v)));
                }
            )*
            lookup_single(ctx, $model, equals).await
        }
    };
}

macro_rules! root_connection_field {
    ($name:ident, $conn:ident, $model:expr) => {
        async fn $name(
            &self,
            ctx: &Context<'_>,
            first: Option<i32>,
            after: Option<String>,
            last: Option<i32>,
            before: Option<String>,
            filter: Option<FilterInput>,
            sort: Option<Vec<SortInput>>,
        ) -> GqlResult<$conn> {
            root_connection(ctx, $model, first, after, last, before, filter, sort).await
        }
    };
}

#[Object]
impl Database {
    root_field!(alert_subscription, AlertSubscription, &model::ALERT_SUBSCRIPTION, [id]);
    root_connection_field!(alert_subscriptions, AlertSubscriptionConnection, &model::ALERT_SUBSCRIPTION);

    root_field!(campaign_type, CampaignType, &model::CAMPAIGN_TYPE, [id]);
    root_connection_field!(campaign_types, CampaignTypeConnection, &model::CAMPAIGN_TYPE);

    root_field!(campaign, Campaign, &model::CAMPAIGN, [id, name]);
    root_connection_field!(campaigns, CampaignConnection, &model::CAMPAIGN);

    root_field!(company, Company, &model::COMPANY, [id, name]);
    root_connection_field!(companies, CompanyConnection, &model::COMPANY);

    root_field!(company_department, CompanyDepartment, &model::COMPANY_DEPARTMENT, [id]);
    root_connection_field!(company_departments, CompanyDepartmentConnection, &model::COMPANY_DEPARTMENT);

    root_field!(credential, Credential, &model::CREDENTIAL, [id]);
    root_connection_field!(credentials, CredentialConnection, &model::CREDENTIAL);

    root_field!(deaddrop_connection, DeaddropConnection, &model::DEADDROP_CONNECTION, [id]);
    root_connection_field!(deaddrop_connections, DeaddropConnectionConnection, &model::DEADDROP_CONNECTION);

    root_field!(deaddrop_deployment, DeaddropDeployment, &model::DEADDROP_DEPLOYMENT, [id]);
    root_connection_field!(deaddrop_deployments, DeaddropDeploymentConnection, &model::DEADDROP_DEPLOYMENT);

    root_field!(industry, Industry, &model::INDUSTRY, [id]);
    root_connection_field!(industries, IndustryConnection, &model::INDUSTRY);

    root_field!(landing_page, LandingPage, &model::LANDING_PAGE, [id]);
    root_connection_field!(landing_pages, LandingPageConnection, &model::LANDING_PAGE);

    root_field!(message, Message, &model::MESSAGE, [id]);
    root_connection_field!(messages, MessageConnection, &model::MESSAGE);

    root_field!(user, User, &model::USER, [id, name]);
    root_connection_field!(users, UserConnection, &model::USER);

    root_field!(visit, Visit, &model::VISIT, [id]);
    root_connection_field!(visits, VisitConnection, &model::VISIT);
}
