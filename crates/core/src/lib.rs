pub mod encoding {
    pub mod encode_logger;
    pub mod encoder_event;
    mod frame_loop;
    pub mod movie_encoder;
    pub mod stream_state;

    pub use frame_loop::SequencerOptions;
}

pub mod frame_source {
    pub mod domain {
        pub mod draw_surface;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod color_space;
    pub mod constants;
    pub mod error;
    pub mod frame_duration;
    pub mod frame_size;
    pub mod pixel_buffer;
    pub mod stream_config;
}

pub mod video {
    pub mod domain {
        pub mod video_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_writer;
        pub mod h264_capabilities;
        pub mod threaded_video_writer;
    }
}
