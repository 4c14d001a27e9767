use axum::Json;
use serde_json::{json, Value};

/// `GET /apidocs/` — OpenAPI description of the commission endpoints.
pub async fn openapi() -> Json<Value> {
    Json(document())
}

fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "API de Gestão de Comissões",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/comissao": {
                "post": add_operation(),
                "delete": delete_operation(),
            },
            "/comissoes": { "get": list_operation() },
            "/dashboard": { "get": dashboard_operation() },
        },
        "components": { "schemas": schemas() },
    })
}

fn add_operation() -> Value {
    let created = json!({
        "type": "object",
        "properties": {
            "message": { "type": "string" },
            "comissao": schema_ref("Comissao"),
        }
    });
    json!({
        "tags": ["Comissões"],
        "summary": "Adiciona uma nova venda/comissão",
        "requestBody": {
            "required": true,
            "content": { "application/json": { "schema": schema_ref("NovaVenda") } }
        },
        "responses": {
            "201": json_response("Comissão criada com sucesso", created),
            "400": problem_response("Erro na requisição"),
            "500": problem_response("Falha no armazenamento"),
        }
    })
}

fn delete_operation() -> Value {
    let removed = json!({
        "type": "object",
        "properties": { "message": { "type": "string" } }
    });
    json!({
        "tags": ["Comissões"],
        "summary": "Remove uma comissão pelo ID",
        "parameters": [{
            "in": "query",
            "name": "id",
            "required": true,
            "schema": { "type": "integer", "minimum": 1 }
        }],
        "responses": {
            "200": json_response("Comissão removida", removed),
            "400": problem_response("ID ausente ou inválido"),
            "404": problem_response("Comissão não encontrada"),
        }
    })
}

fn list_operation() -> Value {
    let listed = json!({
        "type": "object",
        "properties": {
            "comissoes": { "type": "array", "items": schema_ref("Comissao") }
        }
    });
    json!({
        "tags": ["Comissões"],
        "summary": "Lista todas as comissões registradas",
        "responses": { "200": json_response("Lista de comissões", listed) }
    })
}

fn dashboard_operation() -> Value {
    json!({
        "tags": ["Dashboard"],
        "summary": "Retorna totais para o dashboard",
        "responses": { "200": json_response("Dados sumarizados", schema_ref("Dashboard")) }
    })
}

fn schemas() -> Value {
    let nova_venda = json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["vendedor", "produto", "valor_venda"],
        "properties": {
            "vendedor": { "type": "string", "maxLength": 100, "example": "Carlos Silva" },
            "produto": { "type": "string", "maxLength": 100, "example": "Notebook Gamer" },
            "valor_venda": { "type": "number", "minimum": 0, "example": 5000.00 },
            "data_venda": { "type": "string", "example": "2024-03-09 14:05:30" }
        }
    });
    let comissao = json!({
        "type": "object",
        "required": ["id", "vendedor", "produto", "valor_venda", "comissao_calculada", "data_venda"],
        "properties": {
            "id": { "type": "integer" },
            "vendedor": { "type": "string" },
            "produto": { "type": "string" },
            "valor_venda": { "type": "number" },
            "comissao_calculada": { "type": "number" },
            "data_venda": { "type": "string", "example": "2024-03-09 14:05:30" }
        }
    });
    let dashboard = json!({
        "type": "object",
        "properties": {
            "total_vendas": { "type": "number" },
            "total_comissoes": { "type": "number" },
            "quantidade_vendas": { "type": "integer" }
        }
    });
    let problem = json!({
        "type": "object",
        "properties": {
            "type": { "type": "string" },
            "title": { "type": "string" },
            "message": { "type": "string" },
            "detail": { "type": "string" }
        }
    });
    json!({
        "NovaVenda": nova_venda,
        "Comissao": comissao,
        "Dashboard": dashboard,
        "Problem": problem,
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn problem_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/problem+json": { "schema": schema_ref("Problem") } }
    })
}
