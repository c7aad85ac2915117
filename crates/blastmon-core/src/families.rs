//! VMware Blast counter families.
//!
//! Each family binds one `VMware Blast <X> Counters` object to a field table.
//! Most virtual channels expose the same seven counters and share
//! `CHANNEL_FIELDS`; Imaging and Session carry their own tables.

use crate::counter::{Combine, FieldSpec, SchemaDescriptor, SchemaError};

/// Static definition of one counter family.
#[derive(Debug, Clone, Copy)]
pub struct FamilyDef {
    /// Family part of the exported metric name, e.g. `session`.
    pub name: &'static str,
    pub counter_object: &'static str,
    pub fields: &'static [FieldSpec],
}

impl FamilyDef {
    pub fn schema(&self) -> Result<SchemaDescriptor, SchemaError> {
        SchemaDescriptor::new(self.counter_object, self.fields)
    }
}

/// Counters every Blast virtual channel exposes.
pub const CHANNEL_FIELDS: &[FieldSpec] = &[
    FieldSpec::gauge(
        "inbound_bandwidth_kbps",
        "Inbound Bandwidth (Kbps)",
        "Channel Receive Bandwidth (Kbps)",
    ),
    FieldSpec::gauge(
        "outbound_bandwidth_kbps",
        "Outbound Bandwidth (Kbps)",
        "Channel Send Bandwidth (Kbps)",
    ),
    FieldSpec::gauge(
        "out_queuing_time_us",
        "Out Queueing time (us)",
        "Out queueing time in VVC (us)",
    )
    .combine(Combine::Average),
    FieldSpec::counter("received_bytes", "Received Bytes", "Received Bytes"),
    FieldSpec::counter("received_packets", "Received Packets", "Received Packets"),
    FieldSpec::counter("transmitted_bytes", "Transmitted Bytes", "Transmitted Bytes"),
    FieldSpec::counter(
        "transmitted_packets",
        "Transmitted Packets",
        "Transmitted Packets",
    ),
];

pub const IMAGING_FIELDS: &[FieldSpec] = &[
    FieldSpec::gauge(
        "dirty_frames_per_second",
        "Dirty frames per second",
        "Dirty frame rate per second",
    ),
    FieldSpec::gauge("encoder_type", "Encoder Type", "Current encoder type").combine(Combine::Max),
    FieldSpec::gauge("fbc_rate", "FBC Rate", "FBC rate"),
    FieldSpec::gauge("frames_per_second", "Frames per second", "Frame rate per second"),
    FieldSpec::gauge(
        "inbound_bandwidth_kbps",
        "Inbound Bandwidth (Kbps)",
        "Channel Receive Bandwidth (Kbps)",
    ),
    FieldSpec::gauge(
        "outbound_bandwidth_kbps",
        "Outbound Bandwidth (Kbps)",
        "Channel Send Bandwidth (Kbps)",
    ),
    FieldSpec::gauge(
        "out_queuing_time_us",
        "Out Queueing time (us)",
        "Out queueing time in VVC (us)",
    )
    .combine(Combine::Average),
    FieldSpec::gauge("poll_rate", "Poll Rate", "Poll rate"),
    FieldSpec::counter("received_bytes", "Received Bytes", "Received Bytes"),
    FieldSpec::counter("received_packets", "Received Packets", "Received Packets"),
    FieldSpec::counter(
        "total_dirty_frames",
        "Total dirty frames",
        "Total dirty frames for session",
    ),
    FieldSpec::counter("fbc", "Total FBC", "Total FBC for session"),
    FieldSpec::counter("frames", "Total frames", "Total frames for session"),
    FieldSpec::counter("poll", "Total poll", "Total poll for session"),
    FieldSpec::counter("transmitted_bytes", "Transmitted Bytes", "Transmitted Bytes"),
    FieldSpec::counter(
        "transmitted_packets",
        "Transmitted Packets",
        "Transmitted Packets",
    ),
];

pub const SESSION_FIELDS: &[FieldSpec] = &[
    FieldSpec::counter(
        "automatic_reconnect_count",
        "Automatic Reconnect Count",
        "Total number of reconnects that happened after session interruptions",
    ),
    FieldSpec::counter(
        "cumulative_received_bytes_over_tcp",
        "Cumulative Received Bytes over TCP",
        "Cumulative received bytes on the connection over TCP",
    ),
    FieldSpec::counter(
        "cumulative_received_bytes_over_udp",
        "Cumulative Received Bytes over UDP",
        "Cumulative received bytes on the connection over UDP",
    ),
    FieldSpec::counter(
        "cumulative_transmitted_bytes_over_tcp",
        "Cumulative Transmitted Bytes over TCP",
        "Cumulative transmitted bytes on the connection over TCP",
    ),
    FieldSpec::counter(
        "cumulative_transmitted_bytes_over_udp",
        "Cumulative Transmitted Bytes over UDP",
        "Cumulative transmitted bytes on the connection over UDP",
    ),
    FieldSpec::gauge(
        "estimated_bandwidth_uplink_kbps",
        "Estimated Bandwidth (Uplink)",
        "Estimated network bandwidth for uplink in Kbps",
    ),
    FieldSpec::gauge(
        "instantaneous_received_bytes_over_tcp",
        "Instantaneous Received Bytes over TCP",
        "Instantaneous received bytes on the connection over TCP",
    ),
    FieldSpec::gauge(
        "instantaneous_received_bytes_over_udp",
        "Instantaneous Received Bytes over UDP",
        "Instantaneous received bytes on the connection over UDP",
    ),
    FieldSpec::gauge(
        "instantaneous_transmitted_bytes_over_tcp",
        "Instantaneous Transmitted Bytes over TCP",
        "Instantaneous transmitted bytes on the connection over TCP",
    ),
    FieldSpec::gauge(
        "instantaneous_transmitted_bytes_over_udp",
        "Instantaneous Transmitted Bytes over UDP",
        "Instantaneous transmitted bytes on the connection over UDP",
    ),
    FieldSpec::gauge(
        "jitter_uplink_ms",
        "Jitter (Uplink)",
        "Network jitter for uplink in Milliseconds",
    )
    .combine(Combine::Average),
    FieldSpec::gauge(
        "packet_loss_uplink",
        "Packet Loss (Uplink)",
        "Network packet loss for uplink in percentage",
    )
    .combine(Combine::Average),
    FieldSpec::counter(
        "received_bytes",
        "Received Bytes",
        "Received bytes on the connection",
    ),
    FieldSpec::counter("received_packets", "Received Packets", "Received packets"),
    FieldSpec::gauge("rtt_ms", "RTT", "Estimated RTT in Milliseconds").combine(Combine::Average),
    FieldSpec::counter(
        "transmitted_bytes",
        "Transmitted Bytes",
        "Transmitted bytes on the connection",
    ),
    FieldSpec::counter(
        "transmitted_packets",
        "Transmitted Packets",
        "Transmitted Packets",
    ),
];

const fn channel(name: &'static str, counter_object: &'static str) -> FamilyDef {
    FamilyDef {
        name,
        counter_object,
        fields: CHANNEL_FIELDS,
    }
}

/// All Blast families in registration order.
pub const BLAST_FAMILIES: &[FamilyDef] = &[
    channel("audio", "VMware Blast Audio Counters"),
    channel("cdr", "VMware Blast CDR Counters"),
    channel("clipboard", "VMware Blast Clipboard Counters"),
    channel("html5_mmr", "VMware Blast HTML5 MMR Counters"),
    FamilyDef {
        name: "imaging",
        counter_object: "VMware Blast Imaging Counters",
        fields: IMAGING_FIELDS,
    },
    channel("other_feature", "VMware Blast Other Feature Counters"),
    channel("printing", "VMware Blast Printing Counters"),
    channel("rde_server", "VMware Blast RdeServer Counters"),
    channel("rtav", "VMware Blast RTAV Counters"),
    channel("sdr", "VMware Blast SDR Counters"),
    channel(
        "serial_port_and_scanner",
        "VMware Blast Serial Port and Scanner Counters",
    ),
    FamilyDef {
        name: "session",
        counter_object: "VMware Blast Session Counters",
        fields: SESSION_FIELDS,
    },
    channel("smart_card", "VMware Blast Smart Card Counters"),
    channel("usb", "VMware Blast USB Counters"),
    channel("view_scanner", "VMware Blast View Scanner Counters"),
    channel("windows_media_mmr", "VMware Blast Windows Media MMR Counters"),
];

/// Looks up a family by name.
pub fn find(name: &str) -> Option<&'static FamilyDef> {
    BLAST_FAMILIES.iter().find(|f| f.name == name)
}
