use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vessel_tracker::{
    AppState, config::Settings, create_router, data::FleetStore, local_today, routes::RouteTable,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vessel_tracker=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().expect("valid settings");

    let routes = match &settings.routes_path {
        Some(path) => {
            let table = RouteTable::from_file(path).expect("load route table");
            tracing::info!("loaded route table from {}", path.display());
            table
        }
        None => RouteTable::builtin().expect("built-in route table"),
    };
    for route in routes.routes() {
        tracing::info!(
            "route {}: {} waypoints, {:.2} km",
            route.name(),
            route.waypoints().len(),
            route.length_km()
        );
    }

    tracing::info!(
        "fleet documents: {:?}, {:?} (refresh every {:?})",
        settings.fleet.details_path,
        settings.fleet.contents_path,
        settings.fleet.refresh_interval
    );

    let state = AppState {
        routes: Arc::new(routes),
        fleet: Arc::new(FleetStore::new(settings.fleet.clone())),
        inland_transit_days: settings.inland_transit_days,
        today: local_today,
    };
    let app = create_router(state);

    let addr = settings.addr;
    tracing::info!("starting vessel tracker on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  GET /api/vessels - Fleet overview table");
    tracing::info!("  GET /api/positions - Estimated vessel positions");
    tracing::info!("  GET /api/routes - Route polylines");
    tracing::info!("  GET /api/routes/:name - Route polyline with GPX track");
    tracing::info!("  GET /api/locate?origin=&fraction= - Position along an origin's route");
    tracing::info!("  GET /vessel/:vessel_id - Cargo manifest");

    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
