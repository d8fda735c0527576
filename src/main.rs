use std::sync::Arc;

use actix_web::{get, post, web, App, HttpResponse, HttpServer};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use anyhow::Context;
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use clap::Parser;
use jsonwebtoken::DecodingKey;
use log::info;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::token::decode_access_token;
use crate::backend::{Backend, PgBackend};
use crate::commands::{Cli, Command};
use crate::config::Config;
use crate::graphql::{build_schema, GraphQLSchema};

const GRAPHQL_ENDPOINT: &str = "/graphql";
const GRAPHQL_PLAYGROUND_ENDPOINT: &str = "/playground";

mod ac;
mod auth;
mod backend;
mod commands;
mod config;
mod device;
mod fallible;
mod graphql;
mod guards;
mod profiles;
mod receipt;
mod subscription;
#[cfg(test)]
mod tests;
mod whatsapp;

#[post("/graphql")]
async fn execute_graphql(
    schema: web::Data<GraphQLSchema>,
    key: web::Data<DecodingKey>,
    auth: Option<BearerAuth>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();
    // an invalid token is treated like none, resolvers decide what that means
    if let Some(claims) = auth.and_then(|auth| decode_access_token(auth.token(), &key)) {
        request = request.data(claims);
    }
    schema.execute(request).await.into()
}

#[get("/graphql/sdl")]
async fn getsdl(schema: web::Data<GraphQLSchema>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(schema.sdl())
}

#[get("/playground")]
async fn playground() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint(GRAPHQL_ENDPOINT).finish())
}

#[get("/healthz")]
async fn healthz() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    info!("Connecting to the database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.db_uri)
        .await
        .context("can't connect to database")
}

async fn serve(config: Config, backend: Arc<dyn Backend>) -> anyhow::Result<()> {
    let schema = build_schema(backend, &config.admin_email);
    let key = web::Data::new(config.jwt_secret.1.clone());

    info!("Starting http server on {}", config.listen);
    info!(
        "GraphiQL is available at http://{}{}",
        config.listen, GRAPHQL_PLAYGROUND_ENDPOINT
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(schema.clone()))
            .app_data(key.clone())
            .service(execute_graphql)
            .service(getsdl)
            .service(playground)
            .service(healthz)
    })
    .bind(config.listen)?
    .run()
    .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = Config::load()?;
    if !cli.command.needs_backend() {
        return commands::run_offline(cli.command, &config).await;
    }

    let pool = connect(&config).await?;
    let backend: Arc<dyn Backend> = Arc::new(PgBackend::new(pool, config.jwt_secret.0.clone()));
    match cli.command {
        Command::Serve => serve(config, backend).await,
        command => commands::run(command, &config, backend).await,
    }
}
