use thiserror::Error;

/// eventrs 시스템의 모든 오류 타입을 정의하는 enum
/// 각 오류는 구체적인 컨텍스트 정보를 포함하여 디버깅을 쉽게 함
#[derive(Error, Debug)]
pub enum EventrsError {
    /// 데이터베이스 관련 오류
    #[error("데이터베이스 오류: {operation} - {reason}")]
    Database { operation: String, reason: String },

    /// 설정 관련 오류 (config.rs의 ConfigError와 연동)
    #[error("설정 오류: {0}")]
    Config(#[from] crate::utility::config::ConfigError),

    /// 데이터 파싱 오류
    #[error("파싱 오류: {data_type} 파싱 실패 - {reason}")]
    Parsing { data_type: String, reason: String },

    /// 요청한 대상이 없음 (이벤트 인덱스, 날짜 등)
    #[error("찾을 수 없음: {target}")]
    NotFound { target: String },

    /// 유효성 검증 오류
    #[error("유효성 검증 실패: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// 일반적인 오류 (기타)
    #[error("오류: {message}")]
    General { message: String },
}

/// eventrs에서 사용하는 Result 타입 별칭
pub type EventrsResult<T> = Result<T, EventrsError>;

impl EventrsError {
    /// 데이터베이스 오류를 간편하게 생성하는 헬퍼 함수
    pub fn database(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// 데이터베이스 쿼리 관련 오류를 생성하는 헬퍼 함수
    pub fn database_query(message: impl Into<String>) -> Self {
        Self::Database {
            operation: "쿼리 실행".to_string(),
            reason: message.into(),
        }
    }

    /// 데이터 파싱 오류를 간편하게 생성하는 헬퍼 함수
    pub fn parsing(data_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parsing {
            data_type: data_type.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 일반적인 오류를 생성하는 헬퍼 함수
    pub fn general(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
        }
    }
}

/// Rusqlite 데이터베이스 오류를 EventrsError로 변환
impl From<rusqlite::Error> for EventrsError {
    fn from(error: rusqlite::Error) -> Self {
        let operation = match &error {
            rusqlite::Error::SqliteFailure(_, _) => "SQL 실행",
            rusqlite::Error::InvalidPath(_) => "경로 확인",
            rusqlite::Error::InvalidColumnIndex(_) => "컬럼 인덱스",
            rusqlite::Error::InvalidColumnName(_) => "컬럼 이름",
            rusqlite::Error::InvalidColumnType(_, _, _) => "컬럼 타입",
            rusqlite::Error::QueryReturnedNoRows => "조회 결과 없음",
            _ => "데이터베이스 작업",
        };

        EventrsError::Database {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }
}

/// JSON 직렬화 오류를 EventrsError로 변환
impl From<serde_json::Error> for EventrsError {
    fn from(error: serde_json::Error) -> Self {
        EventrsError::parsing("JSON", error.to_string())
    }
}
