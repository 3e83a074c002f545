//! Drinks endpoint integration tests.
//!
//! Exercises the catalog endpoints end to end using the `TestDrinksServer`
//! harness with an in-memory repository.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use drinks_service::models::{Ingredient, NewDrink};
use drinks_test_utils::TestDrinksServer;
use serde_json::{json, Value};

const ALL_PERMISSIONS: &[&str] = &[
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];

fn ingredient(name: &str, color: &str, parts: u32) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        color: color.to_string(),
        parts,
    }
}

fn seed() -> Vec<NewDrink> {
    vec![
        NewDrink {
            title: "Water".to_string(),
            recipe: vec![ingredient("Water", "blue", 1)],
        },
        NewDrink {
            title: "Flat White".to_string(),
            recipe: vec![
                ingredient("Espresso", "brown", 1),
                ingredient("Steamed milk", "white", 2),
            ],
        },
    ]
}

/// Test that GET /drinks hides ingredient names.
#[tokio::test]
async fn test_get_drinks_returns_short_representation() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;

    let response = reqwest::get(format!("{}/drinks", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({
            "success": true,
            "drinks": [
                {"id": 1, "title": "Water", "recipe": [{"color": "blue", "parts": 1}]},
                {"id": 2, "title": "Flat White", "recipe": [
                    {"color": "brown", "parts": 1},
                    {"color": "white", "parts": 2}
                ]}
            ]
        })
    );

    Ok(())
}

/// Test that GET /drinks on an empty catalog returns an empty list.
#[tokio::test]
async fn test_get_drinks_empty_catalog() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let body: Value = reqwest::get(format!("{}/drinks", server.url()))
        .await?
        .json()
        .await?;

    assert_eq!(body, json!({"success": true, "drinks": []}));

    Ok(())
}

/// Test that GET /drinks-detail returns full recipes.
#[tokio::test]
async fn test_get_drinks_detail_returns_long_representation() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/drinks-detail", server.url()))
        .bearer_auth(server.token(&["get:drinks-detail"]))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["drinks"][1],
        json!({"id": 2, "title": "Flat White", "recipe": [
            {"name": "Espresso", "color": "brown", "parts": 1},
            {"name": "Steamed milk", "color": "white", "parts": 2}
        ]})
    );

    Ok(())
}

/// Test the full create, update, delete flow.
#[tokio::test]
async fn test_drink_lifecycle() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;
    let client = reqwest::Client::new();
    let token = server.token(ALL_PERMISSIONS);

    // Create
    let response = client
        .post(format!("{}/drinks", server.url()))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Matcha Latte",
            "recipe": [
                {"name": "Matcha", "color": "green", "parts": 1},
                {"name": "Milk", "color": "white", "parts": 3}
            ]
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"].as_array().unwrap().len(), 1);
    assert_eq!(body["drinks"][0]["title"], "Matcha Latte");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "Matcha");
    let id = body["drinks"][0]["id"].as_i64().unwrap();

    // Update the title only
    let response = client
        .patch(format!("{}/drinks/{}", server.url(), id))
        .bearer_auth(&token)
        .json(&json!({"title": "Iced Matcha Latte"}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["drinks"][0]["id"], id);
    assert_eq!(body["drinks"][0]["title"], "Iced Matcha Latte");
    assert_eq!(body["drinks"][0]["recipe"][1]["parts"], 3);

    // Delete
    let response = client
        .delete(format!("{}/drinks/{}", server.url(), id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"success": true, "delete": id}));

    // Gone from the public listing
    let body: Value = reqwest::get(format!("{}/drinks", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(body["drinks"], json!([]));

    Ok(())
}

/// Test that a single recipe object is accepted in place of a list.
#[tokio::test]
async fn test_create_drink_accepts_single_ingredient() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/drinks", server.url()))
        .bearer_auth(server.token(&["post:drinks"]))
        .json(&json!({
            "title": "Water",
            "recipe": {"name": "Water", "color": "blue", "parts": 1}
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["drinks"][0]["recipe"],
        json!([{"name": "Water", "color": "blue", "parts": 1}])
    );

    Ok(())
}

/// Test that a duplicate title is rejected with 422.
#[tokio::test]
async fn test_create_drink_duplicate_title() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/drinks", server.url()))
        .bearer_auth(server.token(&["post:drinks"]))
        .json(&json!({
            "title": "Water",
            "recipe": {"name": "Sparkling water", "color": "clear", "parts": 1}
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 422);

    Ok(())
}

/// Test that invalid create bodies are rejected with 400.
#[tokio::test]
async fn test_create_drink_invalid_bodies() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;
    let client = reqwest::Client::new();
    let token = server.token(&["post:drinks"]);

    let bodies = [
        json!({"recipe": {"name": "Water", "color": "blue", "parts": 1}}),
        json!({"title": "Water"}),
        json!({"title": "   ", "recipe": {"name": "Water", "color": "blue", "parts": 1}}),
        json!({"title": "Water", "recipe": []}),
        json!({"title": "Water", "recipe": {"name": "Water", "color": "blue", "parts": 0}}),
        json!({"title": "x".repeat(81), "recipe": {"name": "Water", "color": "blue", "parts": 1}}),
        json!({"title": "Water", "recipe": "water"}),
    ];

    for body in bodies {
        let response = client
            .post(format!("{}/drinks", server.url()))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        assert_eq!(response.status(), 400, "body {body} should be rejected");
    }

    let response = client
        .post(format!("{}/drinks", server.url()))
        .bearer_auth(&token)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Invalid request body");

    Ok(())
}

/// Test that PATCH can replace the recipe.
#[tokio::test]
async fn test_update_drink_recipe() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;

    let response = reqwest::Client::new()
        .patch(format!("{}/drinks/1", server.url()))
        .bearer_auth(server.token(&["patch:drinks"]))
        .json(&json!({"recipe": {"name": "Tonic", "color": "clear", "parts": 2}}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["drinks"][0],
        json!({"id": 1, "title": "Water", "recipe": [
            {"name": "Tonic", "color": "clear", "parts": 2}
        ]})
    );

    Ok(())
}

/// Test PATCH failure modes.
#[tokio::test]
async fn test_update_drink_errors() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;
    let client = reqwest::Client::new();
    let token = server.token(&["patch:drinks"]);

    // Unknown id
    let response = client
        .patch(format!("{}/drinks/999", server.url()))
        .bearer_auth(&token)
        .json(&json!({"title": "Ghost"}))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    // Non-numeric id
    let response = client
        .patch(format!("{}/drinks/abc", server.url()))
        .bearer_auth(&token)
        .json(&json!({"title": "Ghost"}))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    // Nothing to update
    let response = client
        .patch(format!("{}/drinks/1", server.url()))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    // Renaming onto an existing title
    let response = client
        .patch(format!("{}/drinks/1", server.url()))
        .bearer_auth(&token)
        .json(&json!({"title": "Flat White"}))
        .send()
        .await?;
    assert_eq!(response.status(), 422);

    Ok(())
}

/// Test that deleting an unknown drink returns 404.
#[tokio::test]
async fn test_delete_unknown_drink() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(seed()).await?;
    let client = reqwest::Client::new();
    let token = server.token(&["delete:drinks"]);

    let response = client
        .delete(format!("{}/drinks/999", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 404);

    // Deleting twice
    let first = client
        .delete(format!("{}/drinks/1", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(first.status(), 200);
    let second = client
        .delete(format!("{}/drinks/1", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(second.status(), 404);

    Ok(())
}

/// Test that unsupported methods on known paths are 405.
#[tokio::test]
async fn test_unsupported_method_returns_405() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = reqwest::Client::new()
        .put(format!("{}/drinks/1", server.url()))
        .json(&json!({"title": "Water"}))
        .send()
        .await?;

    assert_eq!(response.status(), 405);

    Ok(())
}

/// Test that unknown routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = reqwest::get(format!("{}/coffee", server.url())).await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that CORS preflight requests are answered for browser frontends.
#[tokio::test]
async fn test_cors_preflight() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/drinks-detail", server.url()),
        )
        .header("Origin", "http://localhost:8100")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    Ok(())
}
