use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    validate_optional_string_field(root, "data_dir", "data_dir")?;

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_optional_string_field(index, "index.local_path", "local_path")?;
        validate_u64_field(index, "index.batch_size", "batch_size", 1, 10_000)?;
        validate_u64_field(index, "index.batch_pause_secs", "batch_pause_secs", 0, 3_600)?;
    }

    if let Some(storage) = expect_optional_object(root, "storage")? {
        validate_enum_field(storage, "storage.provider", "provider", &["s3", "disabled"])?;
        validate_non_empty_string_field(storage, "storage.bucket", "bucket")?;
        validate_non_empty_string_field(storage, "storage.archive_key", "archive_key")?;
        validate_u64_field(storage, "storage.max_attempts", "max_attempts", 1, 100)?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            chunking,
            "chunking.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        let size = chunking.get("chunk_size").and_then(|v| v.as_u64()).unwrap_or(1000);
        let overlap = chunking
            .get("chunk_overlap")
            .and_then(|v| v.as_u64())
            .unwrap_or(100);
        if overlap >= size {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'chunking.chunk_overlap': must be smaller than chunk_size ({})",
                size
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_enum_field(llm, "llm.provider", "provider", &["bedrock", "openai"])?;
        validate_non_empty_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_non_empty_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 200_000)?;
        validate_u64_field(llm, "llm.max_attempts", "max_attempts", 1, 100)?;
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        if llm.get("provider").and_then(|v| v.as_str()) == Some("openai") {
            validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
            if !llm.contains_key("base_url") {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'llm.base_url': value is required for the openai provider"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_non_empty_string_field(chat, "chat.api_url", "api_url")?;
        validate_u64_field(chat, "chat.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(filter) = expect_optional_object(root, "enrollment_filter")? {
        validate_optional_string_field(filter, "enrollment_filter.subject", "subject")?;
        validate_string_array_field(filter, "enrollment_filter.files", "files")?;
        validate_f64_field(
            filter,
            "enrollment_filter.min_catalog",
            "min_catalog",
            0.0,
            99_999.0,
        )?;
        validate_f64_field(
            filter,
            "enrollment_filter.max_catalog",
            "max_catalog",
            0.0,
            99_999.0,
        )?;
        let min = filter
            .get("min_catalog")
            .and_then(|v| v.as_f64())
            .unwrap_or(6000.0);
        let max = filter
            .get("max_catalog")
            .and_then(|v| v.as_f64())
            .unwrap_or(7000.0);
        if min > max {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'enrollment_filter.max_catalog': must not be below min_catalog ({})",
                min
            )));
        }
    }

    if let Some(scraper) = expect_optional_object(root, "scraper")? {
        validate_non_empty_string_field(scraper, "scraper.base_url", "base_url")?;
        validate_u64_field(scraper, "scraper.timeout_secs", "timeout_secs", 1, 600)?;
        if let Some(professors) = expect_optional_object(scraper, "professors")? {
            for course in professors.keys() {
                validate_string_array_field(
                    professors,
                    &format!("scraper.professors.{}", course),
                    course,
                )?;
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
