//! Round API handlers: listing, creation, registration, card setup, status,
//! and claim submission.
//!
//! Every failure maps a library error onto an HTTP status plus a stable
//! machine-readable `reason` code, so clients can tell conflicts
//! ("someone else won") from state errors ("round not drawing") without
//! parsing messages.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bingo_hall::claim::{ClaimError, ClaimReceipt, ClaimStatus};
use bingo_hall::game::card::CardCells;
use bingo_hall::game::phase::RoundPhase;
use bingo_hall::round::{
    CardId, Money, NewRound, RoundError, RoundId, RoundStatus, RoundSummary,
};
use bingo_hall::wallet::WalletError;
use bingo_hall::RoundSchedule;

use super::AppState;
use super::middleware::Identity;
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn round_error(error: RoundError) -> ApiError {
    let status = match &error {
        RoundError::RoundNotFound | RoundError::NotRegistered => StatusCode::NOT_FOUND,
        RoundError::InvalidSchedule | RoundError::NegativeAmount | RoundError::Card(_) => {
            StatusCode::BAD_REQUEST
        }
        RoundError::AlreadyRegistered
        | RoundError::CardAlreadyFinalized
        | RoundError::RegistrationNotOpen
        | RoundError::RegistrationClosed
        | RoundError::NotInSetupWindow
        | RoundError::SetupWindowClosed => StatusCode::CONFLICT,
        RoundError::Wallet(WalletError::InsufficientBalance { .. }) => {
            StatusCode::PAYMENT_REQUIRED
        }
        RoundError::Wallet(WalletError::WalletNotFound(_)) => StatusCode::NOT_FOUND,
        RoundError::Wallet(_) => StatusCode::BAD_REQUEST,
        RoundError::ActorUnavailable | RoundError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("round operation failed: {error}");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
            reason: error.reason_code(),
        }),
    )
}

fn claim_error(error: ClaimError) -> ApiError {
    let status = match &error {
        ClaimError::NoCardFound | ClaimError::RoundNotFound => StatusCode::NOT_FOUND,
        ClaimError::AlreadyResolved
        | ClaimError::RoundAlreadyWon
        | ClaimError::RoundNotDrawing => StatusCode::CONFLICT,
        ClaimError::NotAWinningCard => StatusCode::UNPROCESSABLE_ENTITY,
        ClaimError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("claim failed: {error}");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
            reason: error.reason_code(),
        }),
    )
}

/// List all active rounds with participant counts. Public.
pub async fn list_rounds(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoundSummary>>, ApiError> {
    state
        .round_manager
        .list_rounds()
        .await
        .map(Json)
        .map_err(round_error)
}

/// Round status snapshot: derived phase, drawn sequence, participants.
/// Public; this is also the polling/reconnect catch-up path.
pub async fn round_status(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
) -> Result<Json<RoundStatus>, ApiError> {
    state
        .round_manager
        .status(round_id)
        .await
        .map(Json)
        .map_err(round_error)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoundRequest {
    pub title: String,
    pub registration_opens_at: DateTime<Utc>,
    pub registration_closes_at: DateTime<Utc>,
    pub plays_at: DateTime<Utc>,
    pub ticket_price: Money,
    pub prize_amount: Money,
}

#[derive(Debug, Serialize)]
pub struct CreateRoundResponse {
    pub round_id: RoundId,
}

/// Create a round. Administrator only.
pub async fn create_round(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateRoundRequest>,
) -> Result<(StatusCode, Json<CreateRoundResponse>), ApiError> {
    if !identity.is_admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "administrator role required".to_string(),
                reason: "admin_only",
            }),
        ));
    }

    let new_round = NewRound {
        title: request.title,
        schedule: RoundSchedule {
            registration_opens_at: request.registration_opens_at,
            registration_closes_at: request.registration_closes_at,
            plays_at: request.plays_at,
        },
        ticket_price: request.ticket_price,
        prize_amount: request.prize_amount,
    };

    let round_id = state
        .round_manager
        .create_round(new_round)
        .await
        .map_err(round_error)?;
    metrics::round_created();
    Ok((StatusCode::CREATED, Json(CreateRoundResponse { round_id })))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub card_id: CardId,
}

/// Register the caller for a round: deduct the ticket price and create
/// their empty card.
pub async fn register(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
    Extension(identity): Extension<Identity>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let card_id = state
        .round_manager
        .register(round_id, identity.user_id)
        .await
        .map_err(round_error)?;
    metrics::registration_completed();
    Ok((StatusCode::CREATED, Json(RegisterResponse { card_id })))
}

#[derive(Debug, Deserialize)]
pub struct FinalizeCardRequest {
    /// 25 cell values as the client entered them; invalid and duplicated
    /// entries come back blanked.
    pub cells: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeCardResponse {
    pub cells: CardCells,
}

/// Finalize the caller's card for a round, within the setup window.
pub async fn finalize_card(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<FinalizeCardRequest>,
) -> Result<Json<FinalizeCardResponse>, ApiError> {
    state
        .round_manager
        .finalize_card(round_id, identity.user_id, &request.cells)
        .await
        .map(|cells| Json(FinalizeCardResponse { cells }))
        .map_err(round_error)
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub card_id: CardId,
    pub cells: Option<CardCells>,
    pub is_winner: bool,
    pub claim_status: Option<ClaimStatus>,
    pub win_amount: Money,
    pub round_phase: RoundPhase,
}

/// The caller's card for a round, with the round's current phase.
pub async fn my_card(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<CardResponse>, ApiError> {
    let card = state
        .round_manager
        .card_for_user(round_id, identity.user_id)
        .await
        .map_err(round_error)?;
    let status = state
        .round_manager
        .status(round_id)
        .await
        .map_err(round_error)?;

    Ok(Json(CardResponse {
        card_id: card.id,
        cells: card.cells,
        is_winner: card.is_winner,
        claim_status: card.claim_status,
        win_amount: card.win_amount,
        round_phase: status.phase,
    }))
}

/// Submit a win claim; the round's actor runs the authoritative
/// verification and first-claim-wins arbitration.
pub async fn submit_claim(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ClaimReceipt>, ApiError> {
    match state
        .round_manager
        .submit_claim(round_id, identity.user_id)
        .await
    {
        Ok(receipt) => {
            metrics::claim_resolved(true);
            Ok(Json(receipt))
        }
        Err(error) => {
            if matches!(
                error,
                ClaimError::NotAWinningCard | ClaimError::RoundAlreadyWon
            ) {
                metrics::claim_resolved(false);
            }
            Err(claim_error(error))
        }
    }
}
