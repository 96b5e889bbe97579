//! Template-backed stage functions.
//!
//! A deterministic stand-in for real extraction/translation/summarization
//! backends: no network calls, optional simulated latency, and faults
//! injected through a [`FaultPlan`]. The summarize path renders a
//! model-style free-text response and runs it through the structured
//! parser, the same way a real model-backed provider would.

use super::fault::{FaultKind, FaultPlan};
use super::parser::parse_summary;
use super::{StageProvider, SummarizeSource};
use crate::errors::StageError;
use crate::graph::StageKind;
use crate::model::language::SOURCE_LANGUAGE;
use crate::model::{Provenance, Summary, SummarySection, Transcript, Translation};
use async_trait::async_trait;
use std::time::Duration;

/// Deterministic template-backed stage provider.
#[derive(Debug, Default)]
pub struct TemplateStageProvider {
    latency: Duration,
    faults: FaultPlan,
}

impl TemplateStageProvider {
    /// Creates a provider with no latency and no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds simulated latency to every stage call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Installs a fault plan.
    #[must_use]
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    // Returns true when summarize output should be corrupted instead of
    // raising directly; other fault kinds raise here.
    async fn simulate(
        &self,
        stage: StageKind,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<bool, StageError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.faults.check(stage, video_id, language) {
            None => Ok(false),
            Some(FaultKind::Transient) => Err(StageError::transient(format!(
                "injected transient fault at {stage}"
            ))),
            Some(FaultKind::NotFound) => Err(StageError::not_found(video_id)),
            Some(FaultKind::Hang) => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(StageError::transient("hang fault elapsed"))
            }
            Some(FaultKind::MalformedResponse) => {
                if stage == StageKind::Summarize {
                    Ok(true)
                } else {
                    Err(StageError::malformed(format!(
                        "injected malformed response at {stage}"
                    )))
                }
            }
        }
    }

    fn summary_response(video_id: &str, language: &str, corrupt: bool) -> Result<String, StageError> {
        if corrupt {
            return Ok(format!(
                "The summarizer declined to produce structured output for video {video_id} this time."
            ));
        }

        let headings = headings_for(language)?;
        let texts = section_texts_for(language, video_id)?;
        let sections: Vec<_> = headings
            .iter()
            .zip(texts.iter())
            .map(|(heading, text)| serde_json::json!({ "heading": heading, "text": text }))
            .collect();

        let payload = serde_json::json!({
            "video_id": video_id,
            "language": language,
            "sections": sections,
        });

        Ok(format!(
            "Here is the structured summary you asked for.\n{payload}\nLet me know if you need more detail."
        ))
    }
}

#[async_trait]
impl StageProvider for TemplateStageProvider {
    async fn extract(&self, video_id: &str) -> Result<Transcript, StageError> {
        self.simulate(StageKind::Extract, video_id, None).await?;

        Ok(Transcript {
            video_id: video_id.to_owned(),
            language: SOURCE_LANGUAGE.to_owned(),
            text: format!(
                "This is a mock English transcript for video {video_id}. \
                 It covers product updates and next steps."
            ),
            provenance: Provenance::new("template"),
        })
    }

    async fn translate(
        &self,
        transcript: &Transcript,
        target_language: &str,
    ) -> Result<Translation, StageError> {
        self.simulate(
            StageKind::Translate,
            &transcript.video_id,
            Some(target_language),
        )
        .await?;

        let video_id = &transcript.video_id;
        let text = match target_language {
            "es" => format!(
                "Transcripción traducida (ES) del video {video_id}: {}",
                transcript.text
            ),
            "ja" => format!(
                "ビデオ{video_id}の翻訳済み文字起こし（JA）: {}",
                transcript.text
            ),
            "pt" => format!(
                "Transcrição traduzida (PT) do vídeo {video_id}: {}",
                transcript.text
            ),
            other => {
                return Err(StageError::malformed(format!(
                    "no translation template for language '{other}'"
                )))
            }
        };

        Ok(Translation {
            video_id: video_id.clone(),
            language: target_language.to_owned(),
            text,
            source_language: transcript.language.clone(),
        })
    }

    async fn summarize(&self, source: SummarizeSource<'_>) -> Result<Summary, StageError> {
        let corrupt = self
            .simulate(
                StageKind::Summarize,
                source.video_id(),
                Some(source.language()),
            )
            .await?;

        let response = Self::summary_response(source.video_id(), source.language(), corrupt)?;
        parse_summary(&response)
    }

    async fn translate_summary(
        &self,
        summary: &Summary,
        target_language: &str,
    ) -> Result<Summary, StageError> {
        self.simulate(
            StageKind::TranslateSummary,
            &summary.video_id,
            Some(target_language),
        )
        .await?;

        let headings = headings_for(target_language)?;
        let texts = section_texts_for(target_language, &summary.video_id)?;

        Ok(Summary {
            video_id: summary.video_id.clone(),
            language: target_language.to_owned(),
            sections: headings
                .iter()
                .zip(texts)
                .map(|(heading, text)| SummarySection::new(*heading, text))
                .collect(),
        })
    }
}

fn headings_for(language: &str) -> Result<[&'static str; 3], StageError> {
    match language {
        "en" => Ok(["Overview", "Key takeaways", "Follow-up actions"]),
        "es" => Ok(["Resumen general", "Puntos clave", "Acciones de seguimiento"]),
        "ja" => Ok(["概要", "主要なポイント", "フォローアップのアクション"]),
        "pt" => Ok([
            "Resumo geral",
            "Principais aprendizados",
            "Ações de acompanhamento",
        ]),
        other => Err(StageError::malformed(format!(
            "no summary template for language '{other}'"
        ))),
    }
}

fn section_texts_for(language: &str, video_id: &str) -> Result<[String; 3], StageError> {
    match language {
        "en" => Ok([
            format!("The video {video_id} presents product updates and next steps."),
            "Recent progress and team alignment were highlighted.".to_owned(),
            "Schedule a review and share notes with stakeholders.".to_owned(),
        ]),
        "es" => Ok([
            format!("El video {video_id} presenta actualizaciones del producto y próximos pasos."),
            "Se destacó el progreso reciente y la alineación del equipo.".to_owned(),
            "Programar una revisión y compartir notas con las partes interesadas.".to_owned(),
        ]),
        "ja" => Ok([
            format!("ビデオ{video_id}では製品更新と次のステップが説明されています。"),
            "最近の進捗とチームの整合性が強調されました。".to_owned(),
            "レビューを予定し、関係者にメモを共有します。".to_owned(),
        ]),
        "pt" => Ok([
            format!("O vídeo {video_id} apresenta atualizações do produto e próximos passos."),
            "Foram destacados o progresso recente e o alinhamento da equipe.".to_owned(),
            "Agendar uma revisão e compartilhar notas com as partes interessadas.".to_owned(),
        ]),
        other => Err(StageError::malformed(format!(
            "no summary template for language '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Fault;

    fn provider() -> TemplateStageProvider {
        TemplateStageProvider::new()
    }

    #[tokio::test]
    async fn test_extract_produces_english_transcript() {
        let transcript = provider().extract("demo-001").await.unwrap();

        assert_eq!(transcript.video_id, "demo-001");
        assert_eq!(transcript.language, "en");
        assert!(transcript.text.contains("demo-001"));
        assert_eq!(transcript.provenance.source, "template");
    }

    #[tokio::test]
    async fn test_translate_uses_language_template() {
        let stage = provider();
        let transcript = stage.extract("demo-001").await.unwrap();

        let translation = stage.translate(&transcript, "es").await.unwrap();
        assert_eq!(translation.language, "es");
        assert_eq!(translation.source_language, "en");
        assert!(translation.text.starts_with("Transcripción traducida (ES)"));

        let translation = stage.translate(&transcript, "ja").await.unwrap();
        assert!(translation.text.contains("翻訳済み文字起こし"));
    }

    #[tokio::test]
    async fn test_summarize_transcript_three_sections() {
        let stage = provider();
        let transcript = stage.extract("demo-001").await.unwrap();

        let summary = stage
            .summarize(SummarizeSource::Transcript(&transcript))
            .await
            .unwrap();

        assert_eq!(summary.language, "en");
        assert_eq!(summary.sections.len(), 3);
        assert_eq!(summary.sections[0].heading, "Overview");
        assert!(summary.is_well_formed());
    }

    #[tokio::test]
    async fn test_summarize_translation_is_localized() {
        let stage = provider();
        let transcript = stage.extract("demo-001").await.unwrap();
        let translation = stage.translate(&transcript, "pt").await.unwrap();

        let summary = stage
            .summarize(SummarizeSource::Translation(&translation))
            .await
            .unwrap();

        assert_eq!(summary.language, "pt");
        assert_eq!(summary.sections[0].heading, "Resumo geral");
    }

    #[tokio::test]
    async fn test_translate_summary_localizes_headings() {
        let stage = provider();
        let transcript = stage.extract("demo-001").await.unwrap();
        let english = stage
            .summarize(SummarizeSource::Transcript(&transcript))
            .await
            .unwrap();

        let japanese = stage.translate_summary(&english, "ja").await.unwrap();
        assert_eq!(japanese.language, "ja");
        assert_eq!(japanese.sections.len(), 3);
        assert_eq!(japanese.sections[0].heading, "概要");
    }

    #[tokio::test]
    async fn test_transient_fault_raises() {
        let stage = TemplateStageProvider::new().with_faults(
            FaultPlan::new()
                .with_fault(Fault::new(StageKind::Translate, FaultKind::Transient).for_language("ja")),
        );
        let transcript = stage.extract("demo-001").await.unwrap();

        let err = stage.translate(&transcript, "ja").await.unwrap_err();
        assert!(matches!(err, StageError::Transient { .. }));

        // Other languages are unaffected.
        assert!(stage.translate(&transcript, "es").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_fault_flows_through_parser() {
        let stage = TemplateStageProvider::new().with_faults(
            FaultPlan::new()
                .with_fault(Fault::new(StageKind::Summarize, FaultKind::MalformedResponse).times(1)),
        );
        let transcript = stage.extract("demo-001").await.unwrap();

        let err = stage
            .summarize(SummarizeSource::Transcript(&transcript))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MalformedResponse { .. }));

        // The fault budget is spent; the next call parses fine.
        assert!(stage
            .summarize(SummarizeSource::Transcript(&transcript))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_not_found_fault() {
        let stage = TemplateStageProvider::new().with_faults(
            FaultPlan::new()
                .with_fault(Fault::new(StageKind::Extract, FaultKind::NotFound).for_video("gone")),
        );

        let err = stage.extract("gone").await.unwrap_err();
        assert!(matches!(err, StageError::NotFound { .. }));
        assert!(stage.extract("present").await.is_ok());
    }
}
