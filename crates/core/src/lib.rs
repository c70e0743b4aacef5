pub mod audio {
    pub mod domain {
        pub mod audio_segment;
        pub mod duration_probe;
        pub mod speaker_diarizer;
        pub mod speech_recognizer;
        pub mod transcoder;
        pub mod transcript;
    }
    pub mod infrastructure;
}

pub mod job {
    pub mod domain {
        pub mod job_handle;
        pub mod job_launcher;
        pub mod job_paths;
        pub mod job_status;
        pub mod lifecycle_marker;
        pub mod transcription_request;
        pub mod worker_args;
    }
    pub mod infrastructure {
        pub mod process_job_launcher;
    }
}

pub mod pipeline {
    pub mod detached_worker_use_case;
    pub mod job_router;
    pub mod pipeline_logger;
    pub mod result_formatter;
    pub mod transcribe_audio_use_case;
    pub mod transcription_pipeline;

    #[cfg(test)]
    mod test_stubs;
}

pub mod shared {
    pub mod constants;
    pub mod error;
    pub mod lazy_model;
    pub mod model_resolver;
    pub mod settings;
    pub mod timestamp;
}
