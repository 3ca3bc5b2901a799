//! OpenAPI document for the gateway HTTP API.
use crate::api::{
    person, system,
    types::{
        AffiliationResponse, EduPersonAllResponse, ErrorResponse, HealthStatus, NameResponse,
        PreferredFirstNameResponse, PrimaryAffiliationResponse, ScopedAffiliationResponse,
    },
};
use crate::person::Person;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "incommon-gateway",
        version = "v1",
        description = "eduPerson attribute gateway over the identity API"
    ),
    paths(
        person::edu_person,
        person::primary_affiliation,
        person::affiliation,
        person::scoped_affiliation,
        person::name,
        person::preferred_first_name,
        person::edu_person_all,
        system::help,
        system::health,
    ),
    components(schemas(
        Person,
        PrimaryAffiliationResponse,
        AffiliationResponse,
        ScopedAffiliationResponse,
        NameResponse,
        PreferredFirstNameResponse,
        EduPersonAllResponse,
        HealthStatus,
        ErrorResponse,
    )),
    tags(
        (name = "person", description = "eduPerson attributes"),
        (name = "system", description = "Help and health")
    )
)]
pub struct ApiDoc;
