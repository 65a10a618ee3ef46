use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{HallId, HallUpdate, NewHall, PersonId};
use super::error::SeatingError;
use super::notify::NotificationDispatcher;
use super::repository::SeatingStore;
use super::service::{AllocationRequest, SeatAllocationService};

type SharedService<S, N> = Arc<SeatAllocationService<S, N>>;

/// Body of the allocation trigger. The hall comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationBody {
    pub departments: Vec<String>,
    #[serde(default)]
    pub first_level_group: Option<Vec<u32>>,
    #[serde(default)]
    pub second_level_group: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeatBody {
    pub seat_label: String,
}

/// Router exposing hall administration, allocation and seat management.
pub fn seating_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/halls",
            post(create_hall_handler::<S, N>).get(list_halls_handler::<S, N>),
        )
        .route("/api/v1/halls/available", get(available_halls_handler::<S, N>))
        .route(
            "/api/v1/halls/:hall_id",
            get(hall_handler::<S, N>)
                .put(update_hall_handler::<S, N>)
                .delete(delete_hall_handler::<S, N>),
        )
        .route(
            "/api/v1/halls/:hall_id/allocate",
            post(allocate_handler::<S, N>),
        )
        .route("/api/v1/halls/:hall_id/seats", get(roster_handler::<S, N>))
        .route(
            "/api/v1/halls/:hall_id/seats/:person_id",
            get(seat_handler::<S, N>)
                .post(add_seat_handler::<S, N>)
                .put(move_seat_handler::<S, N>)
                .delete(remove_seat_handler::<S, N>),
        )
        .route("/api/v1/halls/:hall_id/import", post(import_handler::<S, N>))
        .route(
            "/api/v1/persons/:person_id/halls",
            get(person_halls_handler::<S, N>),
        )
        .with_state(service)
}

pub(crate) fn error_status(error: &SeatingError) -> StatusCode {
    match error {
        SeatingError::NotFound { .. } => StatusCode::NOT_FOUND,
        SeatingError::Validation(_) => StatusCode::BAD_REQUEST,
        SeatingError::Conflict(_) => StatusCode::CONFLICT,
        SeatingError::Internal(_) | SeatingError::Interrupted { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(error: SeatingError) -> Response {
    let status = error_status(&error);
    let payload = match &error {
        SeatingError::Interrupted { phase, summary, .. } => json!({
            "error": error.to_string(),
            "phase": phase,
            "summary": summary,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, SeatingError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_hall_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    axum::Json(hall): axum::Json<NewHall>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::CREATED, service.create_hall(hall))
}

pub(crate) async fn list_halls_handler<S, N>(
    State(service): State<SharedService<S, N>>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.halls())
}

pub(crate) async fn available_halls_handler<S, N>(
    State(service): State<SharedService<S, N>>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.available_halls())
}

pub(crate) async fn hall_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.hall(HallId(hall_id)))
}

pub(crate) async fn update_hall_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
    axum::Json(update): axum::Json<HallUpdate>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.update_hall(HallId(hall_id), update))
}

pub(crate) async fn delete_hall_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let result = service.delete_hall(HallId(hall_id)).map(|released| {
        json!({
            "hall_id": hall_id,
            "released": released.len(),
        })
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn allocate_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
    axum::Json(body): axum::Json<AllocationBody>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = AllocationRequest {
        hall_id: HallId(hall_id),
        departments: body.departments,
        first_level_group: body.first_level_group,
        second_level_group: body.second_level_group,
    };
    respond(StatusCode::OK, service.allocate(request))
}

pub(crate) async fn roster_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.roster(HallId(hall_id)))
}

pub(crate) async fn seat_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((hall_id, person_id)): Path<(u64, u64)>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.seat_in_hall(HallId(hall_id), PersonId(person_id)),
    )
}

pub(crate) async fn add_seat_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((hall_id, person_id)): Path<(u64, u64)>,
    axum::Json(body): axum::Json<SeatBody>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let result = service.add_person(HallId(hall_id), PersonId(person_id), &body.seat_label);
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn move_seat_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((hall_id, person_id)): Path<(u64, u64)>,
    axum::Json(body): axum::Json<SeatBody>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let result = service.move_person(HallId(hall_id), PersonId(person_id), &body.seat_label);
    respond(StatusCode::OK, result)
}

pub(crate) async fn remove_seat_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((hall_id, person_id)): Path<(u64, u64)>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.remove_person(HallId(hall_id), PersonId(person_id)),
    )
}

pub(crate) async fn import_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(hall_id): Path<u64>,
    body: String,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::CREATED,
        service.import_sheet(HallId(hall_id), body.as_bytes()),
    )
}

pub(crate) async fn person_halls_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(person_id): Path<u64>,
) -> Response
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.halls_for_person(PersonId(person_id)))
}
