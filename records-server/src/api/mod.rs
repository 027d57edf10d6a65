pub(crate) mod health;
pub(crate) mod identity;
pub(crate) mod records;

use crate::auth::policy::{RECORDS_ADMIN, RECORDS_SCOPE, RECORDS_USER};
use crate::openapi::{openapi_json_handler, scalar_handler};
use crate::pipeline::authorization::Access;
use crate::pipeline::Endpoints;

const RECORDS: &str = "/api/DataEventRecords";
const RECORD: &str = "/api/DataEventRecords/{id}";

/// Every endpoint the resource server exposes, with its access rule
pub(crate) fn endpoints() -> Endpoints {
    Endpoints::new()
        .get("/health", Access::Anonymous, health::health_check)
        .get(RECORDS, Access::Policy(RECORDS_USER), records::list_records)
        .get(RECORD, Access::Policy(RECORDS_USER), records::get_record)
        .post(RECORDS, Access::Policy(RECORDS_ADMIN), records::create_record)
        .put(RECORD, Access::Policy(RECORDS_ADMIN), records::update_record)
        .delete(RECORD, Access::Policy(RECORDS_ADMIN), records::delete_record)
        .get("/api/identity", Access::Policy(RECORDS_SCOPE), identity::identity)
        .get("/api-docs/openapi.json", Access::Anonymous, openapi_json_handler)
        .get("/scalar", Access::Anonymous, scalar_handler)
}
