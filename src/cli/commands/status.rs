use anyhow::Result;

use super::pipeline::open_store;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{OllamaEmbedder, TagsResponse};

/// Whether `model` is among the pulled models. Untagged names match `:latest`.
fn model_available(tags: &TagsResponse, model: &str) -> bool {
    tags.models.iter().any(|tag| {
        tag.name == model || tag.name.strip_suffix(":latest") == Some(model)
    })
}

pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    let tags = match OllamaEmbedder::new(&config.embedding) {
        Ok(embedder) => embedder.health_check().await.ok(),
        Err(_) => None,
    };

    let (vector_store_connected, points) = match open_store(config) {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let points = if connected {
                store
                    .collection_info(&config.vector_store.collection)
                    .await
                    .ok()
                    .flatten()
                    .map(|info| info.points_count)
            } else {
                None
            };
            (connected, points)
        }
        Err(_) => (false, None),
    };

    let vector_store_location = match config.vector_store.driver {
        VectorDriver::Qdrant => config.vector_store.url.clone(),
        VectorDriver::Local => config
            .vector_store
            .local_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    };

    let status = StatusInfo {
        ollama_url: config.embedding.url.clone(),
        ollama_connected: tags.is_some(),
        embedding_model: config.embedding.model.clone(),
        embedding_model_available: tags
            .as_ref()
            .is_some_and(|t| model_available(t, &config.embedding.model)),
        llm_model: config.generation.model.clone(),
        llm_model_available: tags
            .as_ref()
            .is_some_and(|t| model_available(t, &config.generation.model)),
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_location,
        vector_store_connected,
        collection: config.vector_store.collection.clone(),
        points,
    };

    print!("{}", formatter.format_status(&status));

    if format == OutputFormat::Text {
        if !status.ollama_connected {
            eprintln!();
            eprintln!("Warning: Ollama not reachable. Start it with: ollama serve");
        } else {
            for (model, available) in [
                (&status.embedding_model, status.embedding_model_available),
                (&status.llm_model, status.llm_model_available),
            ] {
                if !available {
                    eprintln!("Hint: pull the model with: ollama pull {}", model);
                }
            }
        }
        if !vector_store_connected && config.vector_store.driver == VectorDriver::Qdrant {
            eprintln!("Warning: Qdrant not running. Start with: docker compose up -d qdrant");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ModelTag;

    #[test]
    fn test_model_available() {
        let tags = TagsResponse {
            models: vec![
                ModelTag {
                    name: "nomic-embed-text:latest".to_string(),
                },
                ModelTag {
                    name: "gemma2:2b".to_string(),
                },
            ],
        };
        assert!(model_available(&tags, "nomic-embed-text"));
        assert!(model_available(&tags, "gemma2:2b"));
        assert!(!model_available(&tags, "gemma2"));
        assert!(!model_available(&tags, "llama3"));
    }
}
