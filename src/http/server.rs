use log::{error, info};
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    config::{Config, HttpConfig, PublicEndpoint},
    domain::{
        id::TrackId,
        track::Track,
        validate::{DEFAULT_DURATION_SECS, MAX_DURATION_SECS, MIN_DURATION_SECS, validate},
    },
    generation::{Simulator, SimulatorSettings},
    http::error::ApiError,
    public_endpoint::download_url,
    storage::{
        artifacts::{ArtifactBody, ArtifactStore},
        registry::TrackRegistry,
    },
};

const SERVICE_NAME: &str = "promptwave";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const SUPPORTED_FORMATS: &[&str] = &["mp3"];
const SUPPORTED_GENRES: &[&str] = &[
    "pop",
    "rock",
    "jazz",
    "classical",
    "electronic",
    "hip-hop",
    "country",
    "reggae",
    "blues",
    "folk",
    "ambient",
    "instrumental",
];
const SUPPORTED_MOODS: &[&str] = &[
    "happy",
    "sad",
    "energetic",
    "relaxing",
    "dramatic",
    "peaceful",
    "mysterious",
    "uplifting",
    "melancholic",
    "triumphant",
    "romantic",
];

pub struct HttpServer {
    registry: Arc<TrackRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    simulator: Simulator,
    max_prompt_chars: usize,
    public_endpoint: PublicEndpoint,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(
        registry: Arc<TrackRegistry>,
        artifacts: Arc<dyn ArtifactStore>,
        config: &Config,
    ) -> Self {
        let simulator = Simulator::new(
            Arc::clone(&registry),
            Arc::clone(&artifacts),
            SimulatorSettings::from(&config.generation),
        );
        Self {
            registry,
            artifacts,
            simulator,
            max_prompt_chars: config.generation.max_prompt_chars,
            public_endpoint: config.public_endpoint.clone(),
            config: config.http.clone(),
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = if request.method() == "OPTIONS" {
            self.handle_preflight()
        } else {
            self.route(request)
        };
        let response = self.with_cors(response);

        info!("Response: {} {} {}", request.method(), request.url(), response.status_code);
        response
    }

    fn route(&self, request: &Request) -> Response {
        // the router cannot express a trailing slash
        if request.method() == "GET" && request.url() == "/music/" {
            return self.handle_music_info();
        }

        rouille::router!(request,
            (GET) (/) => {
                Self::handle_root()
            },
            (GET) (/health) => {
                Self::handle_health()
            },
            (GET) (/music) => {
                self.handle_music_info()
            },
            (POST) (/music/generate) => {
                self.handle_generate(request)
            },
            (GET) (/music/generate) => {
                ApiError::MethodNotAllowed.into_response()
            },
            (GET) (/music/status/{id: String}) => {
                self.handle_status(id)
            },
            (GET) (/downloads/{filename: String}) => {
                self.handle_download(filename)
            },
            _ => ApiError::NotFound("Not Found".into()).into_response()
        )
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn with_cors(&self, response: Response) -> Response {
        match &self.config.cors_allow_origin {
            Some(origin) => {
                response.with_additional_header("Access-Control-Allow-Origin", origin.clone())
            }
            None => response,
        }
    }

    fn handle_preflight(&self) -> Response {
        if self.config.cors_allow_origin.is_none() {
            return ApiError::MethodNotAllowed.into_response();
        }
        Response::text("")
            .with_status_code(204)
            .with_additional_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .with_additional_header("Access-Control-Allow-Headers", "Content-Type")
    }

    fn handle_root() -> Response {
        Response::json(&serde_json::json!({
            "message": "Welcome to the promptwave music generation backend",
            "status": "running",
            "version": VERSION,
        }))
    }

    fn handle_health() -> Response {
        Response::json(&serde_json::json!({
            "status": "healthy",
            "service": SERVICE_NAME,
        }))
    }

    fn handle_music_info(&self) -> Response {
        Response::json(&serde_json::json!({
            "service": SERVICE_NAME,
            "version": VERSION,
            "supported_formats": SUPPORTED_FORMATS,
            "min_duration": MIN_DURATION_SECS,
            "max_duration": MAX_DURATION_SECS,
            "default_duration": DEFAULT_DURATION_SECS,
            "max_prompt_length": self.max_prompt_chars,
            "supported_genres": SUPPORTED_GENRES,
            "supported_moods": SUPPORTED_MOODS,
            "status": "active",
        }))
    }

    /// validates the request, registers the track and starts its simulation
    fn generate(&self, request: &Request) -> Result<Response, ApiError> {
        let body: GenerateRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::Unprocessable(format!("Invalid request body: {e}")))?;

        let validated = validate(&body.prompt, body.duration, self.max_prompt_chars)?;
        let track = self.registry.create(&validated)?;

        if let Err(e) = self.simulator.spawn(track.id.clone()) {
            error!("Could not start simulation of track {}: {e}", track.id);
            self.simulator.mark_failed(&track.id);
            return Err(ApiError::Internal("Could not start generation".into()));
        }

        info!(
            "Generating track {} ({} s, estimated {} s): {:?}",
            track.id, track.requested_duration, track.estimated_processing_secs, track.prompt
        );
        Ok(Response::json(&GenerateResponse::from_domain(&track)))
    }

    fn handle_generate(&self, request: &Request) -> Response {
        match self.generate(request) {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }

    fn handle_status(&self, id: String) -> Response {
        match self.registry.get(&TrackId::new(id)) {
            Ok(track) => Response::json(&StatusResponse::from_domain(&track, &self.public_endpoint)),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    fn download(&self, filename: &str) -> Result<Response, ApiError> {
        let mime = Self::mime_for_file(Path::new(filename));
        let response = match self.artifacts.open(filename)? {
            ArtifactBody::File(file) => Response::from_file(mime, file),
            ArtifactBody::Bytes(bytes) => Response::from_data(mime, bytes),
        };
        log::debug!("DOWNLOAD {filename} -> 200 OK");

        Ok(response.with_additional_header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
    }

    fn handle_download(&self, filename: String) -> Response {
        match self.download(&filename) {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }

    fn mime_for_file(path: &Path) -> String {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy())
            .map(|s| s.to_lowercase());
        let default = || {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string()
        };
        ext.and_then(|ext| Self::mime_from_ext(ext.as_str()))
            .unwrap_or_else(default)
    }

    /// Map file extension (without dot) to proper MIME type for browser playback.
    /// Returns None if the extension is not recognized.
    pub fn mime_from_ext(ext: &str) -> Option<String> {
        match ext {
            "mp3" => Some("audio/mpeg".to_string()),
            "wav" => Some("audio/wav".to_string()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct GenerateRequest {
    prompt: String,
    #[serde(default)]
    duration: Option<i64>,
}

#[derive(Serialize, Deserialize)]
struct GenerateResponse {
    success: bool,
    message: String,
    track_id: String,
    prompt: String,
    duration: u32,
    estimated_processing_time: u32,
    status: String,
    download_url: Option<String>,
}

impl GenerateResponse {
    fn from_domain(track: &Track) -> Self {
        Self {
            success: true,
            message: format!("Music generation started for prompt: '{}'", track.prompt),
            track_id: track.id.to_string(),
            prompt: track.prompt.clone(),
            duration: track.requested_duration,
            estimated_processing_time: track.estimated_processing_secs,
            status: track.status.as_str().to_string(),
            download_url: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    track_id: String,
    status: String,
    progress: u8,
    prompt: String,
    duration: u32,
    created_at: String,
    estimated_completion: String,
    download_url: Option<String>,
}

impl StatusResponse {
    fn from_domain(track: &Track, endpoint: &PublicEndpoint) -> Self {
        Self {
            track_id: track.id.to_string(),
            status: track.status.as_str().to_string(),
            progress: track.progress,
            prompt: track.prompt.clone(),
            duration: track.requested_duration,
            created_at: timestamp(track.created_at),
            estimated_completion: timestamp(track.estimated_completion),
            download_url: track
                .output
                .as_ref()
                .map(|output| download_url(endpoint, &output.filename)),
        }
    }
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
