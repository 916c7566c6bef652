use thiserror::Error;

#[derive(Error, Debug)]
pub enum CronParseError {
    #[error("invalid cron expression {expression:?}: {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: cron::error::Error,
    },
}
