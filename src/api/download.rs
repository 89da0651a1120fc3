use actix_files::NamedFile;
use actix_web::{
    get,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    mime::Mime,
    web::{Data, Path, ServiceConfig},
};
use tracing::debug;
use uuid::Uuid;

use crate::api::error::ServiceError;
use crate::artifact::{FileArtifactBuilder, PPTX_CONTENT_TYPE};

/// Stream a generated deck as an attachment
#[get("/api/download/{job_id}/{filename}")]
async fn download_file(
    files: Data<FileArtifactBuilder>,
    path: Path<(String, String)>,
) -> Result<NamedFile, ServiceError> {
    let (job_id, filename) = path.into_inner();
    let not_found = || ServiceError::FileNotFound(format!("{job_id}/{filename}"));

    let job = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    let location = files.resolve(job, &filename).ok_or_else(not_found)?;

    let file = NamedFile::open_async(&location).await.map_err(|e| {
        debug!("Cannot open {}: {}", location.display(), e);
        not_found()
    })?;

    let mut file = file.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename.clone())],
    });
    if let Ok(mime) = PPTX_CONTENT_TYPE.parse::<Mime>() {
        file = file.set_content_type(mime);
    }
    Ok(file)
}

pub fn download_config(config: &mut ServiceConfig) {
    config.service(download_file);
}
