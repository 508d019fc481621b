use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::detector::VShapeScope;
use crate::indicators::VolumeColorRule;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("설정 파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),
    #[error("설정 파일 읽기 오류: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("설정 파일 파싱 오류: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("설정 유효성 검증 실패: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub db_path: String,
    /// 분봉 테이블 이름 (지수 이름)
    pub table: String,
    pub datetime_column: String,
    /// 가중 AD 라인 컬럼
    pub ad_line_column: String,
    pub volume_column: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: "data/IntradayGGData.db".to_string(),
            table: "banknifty".to_string(),
            datetime_column: "datetime".to_string(),
            ad_line_column: "AD_LineWeighted".to_string(),
            volume_column: "weighted_volume".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DetectionConfig {
    /// 이 날짜 이후(해당 날짜 제외)의 데이터만 사용
    pub after_date: Option<NaiveDate>,
    /// 일중 고가-저가 범위 기준 (포인트)
    pub range_threshold: f64,
    pub v_shape: VShapeConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            after_date: None,
            range_threshold: 500.0,
            v_shape: VShapeConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct VShapeConfig {
    pub enabled: bool,
    /// 시가 대비 급락/급등 폭 기준
    pub move_threshold: f64,
    /// 종가와 반대편 극값 사이 허용 폭
    pub tolerance: f64,
    pub scope: VShapeScope,
}

impl Default for VShapeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            move_threshold: 250.0,
            tolerance: 50.0,
            scope: VShapeScope::Bar,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    /// AD 라인 EMA 기간
    pub ema_span: usize,
    pub volume_color_rule: VolumeColorRule,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            ema_span: 9,
            volume_color_rule: VolumeColorRule::PreviousClose,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// 지정된 파일에서 설정을 로드
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(format!(
                "{}가 없습니다. config.example.toml을 복사해서 config.toml을 만들어주세요.",
                path
            )));
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // 환경 변수로 오버라이드
        config.apply_env_overrides()?;

        // 설정 유효성 검증
        config.validate()?;

        Ok(config)
    }

    /// 파일이 없으면 기본값으로 진행 (파싱/검증 오류는 그대로 반환)
    ///
    /// 두 번째 값은 기본값을 사용했는지 여부. 로그 시스템은 설정을 읽은 뒤에
    /// 초기화되므로 경고는 호출하는 쪽에서 남긴다.
    pub fn load_or_default(path: &str) -> Result<(Self, bool), ConfigError> {
        match Self::load_from_file(path) {
            Ok(config) => Ok((config, false)),
            Err(ConfigError::FileNotFound(_)) => {
                let mut config = Config::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok((config, true))
            }
            Err(e) => Err(e),
        }
    }

    /// 환경 변수로 설정을 오버라이드
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 오버라이드 (테스트에서 환경 변수 없이 사용)
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("EVENTRS_DB_PATH") {
            self.database.db_path = path;
        }
        if let Some(table) = lookup("EVENTRS_TABLE") {
            self.database.table = table;
        }
        if let Some(date) = lookup("EVENTRS_AFTER_DATE") {
            let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
                ConfigError::ValidationError(format!(
                    "EVENTRS_AFTER_DATE는 YYYY-MM-DD 형식이어야 합니다: {} ({})",
                    date, e
                ))
            })?;
            self.detection.after_date = Some(parsed);
        }
        Ok(())
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.db_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.db_path가 비어 있습니다".to_string(),
            ));
        }

        // 테이블/컬럼 이름은 쿼리에 그대로 들어가므로 식별자만 허용
        let identifiers = [
            ("database.table", &self.database.table),
            ("database.datetime_column", &self.database.datetime_column),
            ("database.ad_line_column", &self.database.ad_line_column),
            ("database.volume_column", &self.database.volume_column),
        ];
        for (field, value) in identifiers {
            if !is_safe_identifier(value) {
                return Err(ConfigError::ValidationError(format!(
                    "{}는 영문/숫자/밑줄만 사용할 수 있습니다: {:?}",
                    field, value
                )));
            }
        }

        let thresholds = [
            ("detection.range_threshold", self.detection.range_threshold),
            (
                "detection.v_shape.move_threshold",
                self.detection.v_shape.move_threshold,
            ),
            ("detection.v_shape.tolerance", self.detection.v_shape.tolerance),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{}는 0 이상의 유한한 값이어야 합니다: {}",
                    field, value
                )));
            }
        }

        if self.chart.ema_span == 0 {
            return Err(ConfigError::ValidationError(
                "chart.ema_span은 1 이상이어야 합니다".to_string(),
            ));
        }

        // 로그 레벨 검증
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "log level은 'error', 'warn', 'info', 'debug', 'trace' 중 하나여야 합니다"
                        .to_string(),
                ))
            }
        }

        Ok(())
    }

    /// 설정을 파일로 저장 (주로 디버깅용)
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("직렬화 오류: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// SQL 식별자로 안전한 이름인지 확인 (영문 시작, 영문/숫자/밑줄)
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
