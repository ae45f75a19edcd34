use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,

    /// Model file directory
    pub models_dir: PathBuf,

    /// Data directory (label map, annotated-image artifact)
    pub data_dir: PathBuf,

    /// Worker thread count
    pub workers: usize,

    /// Development mode
    pub dev_mode: bool,

    /// ONNX Runtime settings
    pub onnx_config: OnnxConfig,

    /// Server settings
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU threads per session
    pub intra_threads: usize,

    /// Graph optimization level
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        data_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 20 * 1024 * 1024, // 20MB
            max_connections: if dev_mode { 10 } else { 1000 },
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            data_dir: PathBuf::from(data_dir),
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }

    /// Path of the YOLO detection model
    pub fn detector_model_path(&self) -> PathBuf {
        self.models_dir.join("yolo_lesion.onnx")
    }

    /// Path of the CNN classification model
    pub fn classifier_model_path(&self) -> PathBuf {
        self.models_dir.join("cnn_lesion.onnx")
    }

    /// Path of the random-forest model
    pub fn forest_model_path(&self) -> PathBuf {
        self.models_dir.join("random_forest.onnx")
    }

    /// Path of the label/description table
    pub fn labels_path(&self) -> PathBuf {
        self.data_dir.join("labels.json")
    }

    /// Fixed path of the annotated detection artifact, overwritten per run
    pub fn annotated_image_path(&self) -> PathBuf {
        self.data_dir.join("deteksi_yolo.jpg")
    }
}
