//! Speech-to-Text Mock Tests
//!
//! Sessionless recognition and model lookup against a local wiremock server.

use serde_json::json;
use wiremock::matchers::{body_bytes, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use watson_sdk::config::{ServiceConfig, ServiceKind};
use watson_sdk::speech_to_text::{DEFAULT_MODEL, RecognizeParams, SpeechToTextService};
use watson_sdk::WatsonError;

fn service(server: &MockServer) -> SpeechToTextService {
    let config = ServiceConfig::for_service(ServiceKind::SpeechToText)
        .with_url(server.uri())
        .with_basic("stt-user", "stt-pass");
    SpeechToTextService::new(config).expect("service should build")
}

#[tokio::test]
async fn test_recognize_posts_audio_body() {
    let server = MockServer::start().await;
    let audio = b"RIFF....WAVEfmt fake audio".to_vec();

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .and(header("content-type", "audio/wav"))
        .and(query_param("model", DEFAULT_MODEL))
        .and(query_param("keywords", "hail,tornadoes"))
        .and(query_param("keywords_threshold", "0.5"))
        .and(query_param("word_alternatives_threshold", "0.9"))
        .and(query_param_is_missing("version"))
        .and(body_bytes(audio.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_index": 0,
            "results": [{
                "final": true,
                "alternatives": [{
                    "transcript": "thunderstorms could produce large hail ",
                    "confidence": 0.89,
                    "timestamps": [["thunderstorms", 1.49, 2.32], ["could", 2.32, 2.54]],
                    "word_confidence": [["thunderstorms", 0.95], ["could", 0.99]]
                }],
                "keywords_result": {
                    "hail": [{
                        "normalized_text": "hail",
                        "start_time": 3.72,
                        "end_time": 4.07,
                        "confidence": 0.98
                    }]
                },
                "word_alternatives": [{
                    "start_time": 1.49,
                    "end_time": 2.32,
                    "alternatives": [{"confidence": 0.95, "word": "thunderstorms"}]
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = RecognizeParams::new("audio/wav")
        .with_model(DEFAULT_MODEL)
        .with_keywords(["hail", "tornadoes"], 0.5)
        .with_word_alternatives_threshold(0.9);

    let results = service(&server).recognize(audio, &params).await.unwrap();

    assert_eq!(results.result_index, Some(0));
    assert_eq!(results.transcript(), "thunderstorms could produce large hail");

    let result = &results.results.as_ref().unwrap()[0];
    assert!(result.is_final());
    assert_eq!(result.keyword_hits("hail").len(), 1);
    assert!(result.keyword_hits("tornadoes").is_empty());

    let alternative = result.best_alternative().unwrap();
    let timestamps = alternative.timestamps.as_ref().unwrap();
    assert_eq!(timestamps[0], ("thunderstorms".to_string(), 1.49, 2.32));
    assert_eq!(result.word_alternatives.as_ref().unwrap()[0].alternatives[0].word, "thunderstorms");
}

#[tokio::test]
async fn test_recognize_rejects_empty_audio() {
    let server = MockServer::start().await;

    let err = service(&server)
        .recognize(Vec::new(), &RecognizeParams::new("audio/wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, WatsonError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recognize_bad_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "code_description": "Bad Request",
            "error": "Model en-XX_FooModel not found"
        })))
        .mount(&server)
        .await;

    let params = RecognizeParams::new("audio/flac").with_model("en-XX_FooModel");
    let err = service(&server)
        .recognize(b"fLaC".to_vec(), &params)
        .await
        .unwrap_err();

    match err {
        WatsonError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Model en-XX_FooModel not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_and_get_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{
                "name": "en-US_BroadbandModel",
                "language": "en-US",
                "rate": 16000,
                "url": "https://example.com/v1/models/en-US_BroadbandModel",
                "description": "US English broadband model.",
                "supported_features": {"custom_language_model": true, "speaker_labels": true}
            }, {
                "name": "en-US_NarrowbandModel",
                "language": "en-US",
                "rate": 8000
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/models/en-US_NarrowbandModel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "en-US_NarrowbandModel",
            "language": "en-US",
            "rate": 8000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);

    let models = service.list_models().await.unwrap();
    assert_eq!(models.models.len(), 2);
    assert!(models.models[0].supported_features.as_ref().unwrap().speaker_labels);

    let model = service.get_model("en-US_NarrowbandModel").await.unwrap();
    assert_eq!(model.rate, Some(8000));
}

#[tokio::test]
async fn test_malformed_response_is_deserialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = service(&server).list_models().await.unwrap_err();
    assert!(matches!(err, WatsonError::Deserialization(_)));
}
