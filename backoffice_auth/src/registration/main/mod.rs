mod token;
mod workflow;

pub(crate) use workflow::{
    approve_registration, authorize_ceremony, consume_request, get_registration_request,
    link_identity, list_registration_requests, reject_registration, request_registration,
    validate_token,
};
