//! Tripmate server entry point.

use std::sync::Arc;

use axum::{Router, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripmate_api::{middleware::AppState, router as api_router};
use tripmate_common::Config;
use tripmate_core::{
    ActivityService, Audience, BuddyService, ConversationService, EventService, ProfileService,
    StoredConversations, SuggestionService, TripService, UserService,
};
use tripmate_db::repositories::{
    ActivityRepository, BlockingRepository, BuddyRepository, ConversationRepository,
    EventRepository, InvitationRepository, TripRepository, UserProfileRepository, UserRepository,
};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripmate=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting tripmate server...");

    let config = Config::load()?;

    let db = tripmate_db::connect(&config.database).await?;
    tripmate_db::migrate(&db).await?;

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let profile_repo = UserProfileRepository::new(Arc::clone(&db));
    let trip_repo = TripRepository::new(Arc::clone(&db));
    let buddy_repo = BuddyRepository::new(Arc::clone(&db));
    let blocking_repo = BlockingRepository::new(Arc::clone(&db));
    let invitation_repo = InvitationRepository::new(Arc::clone(&db));
    let activity_repo = ActivityRepository::new(Arc::clone(&db));
    let event_repo = EventRepository::new(Arc::clone(&db));
    let conversation_repo = ConversationRepository::new(Arc::clone(&db));

    // Initialize services
    let conversations: ConversationService =
        Arc::new(StoredConversations::new(conversation_repo));
    let audience = Audience::new(buddy_repo.clone(), invitation_repo, user_repo.clone());

    let mut buddy_service =
        BuddyService::new(buddy_repo.clone(), blocking_repo.clone(), user_repo.clone());
    buddy_service.set_conversations(conversations.clone());

    let mut activity_service = ActivityService::new(
        activity_repo,
        user_repo.clone(),
        audience.clone(),
        config.community.clone(),
    );
    activity_service.set_conversations(conversations.clone());

    let mut event_service = EventService::new(
        event_repo,
        user_repo.clone(),
        audience,
        config.community.clone(),
    );
    event_service.set_conversations(conversations);

    let state = AppState {
        user_service: UserService::new(user_repo.clone()),
        profile_service: ProfileService::new(profile_repo.clone(), user_repo.clone()),
        trip_service: TripService::new(trip_repo.clone(), user_repo),
        buddy_service,
        suggestion_service: SuggestionService::new(
            profile_repo,
            trip_repo,
            buddy_repo,
            blocking_repo,
            config.community.clone(),
        ),
        activity_service,
        event_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tripmate_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
