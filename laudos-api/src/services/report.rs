//! Report text generation with response caching

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::ai::{AiError, AiProvider, TextGenerator};
use super::response_cache::ResponseCache;

/// Wraps a generator with a cache and the optional radiology prompt
pub struct ReportService {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<dyn ResponseCache>,
    cache_ttl: Duration,
    medical_context: bool,
}

impl ReportService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        cache: Arc<dyn ResponseCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            generator,
            cache,
            cache_ttl,
            medical_context: false,
        }
    }

    /// Wrap user text in the report formatting instructions before sending
    pub fn with_medical_context(mut self, enabled: bool) -> Self {
        self.medical_context = enabled;
        self
    }

    pub fn provider(&self) -> AiProvider {
        self.generator.provider()
    }

    /// Generate report text for `texto`; identical requests within the TTL
    /// reuse the cached answer
    pub async fn generate_report(&self, texto: &str) -> Result<String, AiError> {
        let provider = self.generator.provider();
        let key = cache_key(texto, provider);

        if let Some(cached) = self.cache.get(&key) {
            debug!(provider = %provider, "Report served from cache");
            return Ok(cached);
        }

        let prompt = if self.medical_context {
            medical_prompt(texto)
        } else {
            texto.to_string()
        };

        match self.generator.generate(&prompt).await {
            Ok(text) => {
                info!(provider = %provider, chars = text.chars().count(), "Report generated");
                self.cache.insert(key, text.clone(), self.cache_ttl);
                Ok(text)
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Report generation failed");
                Err(e)
            }
        }
    }
}

/// Hex SHA-256 of prompt followed by provider name
pub fn cache_key(prompt: &str, provider: AiProvider) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(provider.as_str().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Radiology report instructions around the user's findings
pub fn medical_prompt(texto: &str) -> String {
    format!(
        r#"Contexto: {texto}
Retorne o texto em Markdown com as respectivas formatações.

Usando o contexto acima, gere o laudo radiológico completo seguindo rigorosamente as instruções abaixo:
Título do laudo em negrito e maiúsculo, centralizado.
Em seguida, INDICAÇÃO CLÍNICA em negrito e maiúsculo. Sem indicação fornecida, use "Avaliação Clínica".
TÉCNICA em negrito e maiúsculo, dois pontos e a técnica do exame. Em ultrassonografia, descreva a técnica em modo B e cite o estudo Doppler apenas se mencionado.
LAUDO: em negrito e maiúsculo, descrevendo todas as estruturas da região estudada e não apenas as alterações, sem hífens ou marcadores; enumere achados com números se necessário.
IMPRESSÃO DIAGNÓSTICA: em negrito e maiúsculo, com um achado por linha e sem medidas.

Considerações específicas:
1. Em ultrassonografia de mamas, descreva nódulos pelo léxico BI-RADS e inclua abaixo da conclusão "BI-RADS: X" seguido das recomendações correspondentes.
2. Não mencione a próstata em ultrassonografia do aparelho urinário, salvo indicação em contrário.
3. Não mencione ligamentos cruzados e meniscos em ultrassonografia de joelho.
"#
    )
}
