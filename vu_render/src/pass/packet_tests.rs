use super::*;

#[test]
fn test_packet_uniform_names_round_trip() {
    for u in [PacketUniform::Model, PacketUniform::Scale, PacketUniform::Color, PacketUniform::Material] {
        assert_eq!(u.name().parse::<PacketUniform>().unwrap(), u);
    }
    assert!("proj".parse::<PacketUniform>().is_err());
}

#[test]
fn test_set_and_read_data() {
    let mut packet = Packet::default();
    packet.set_mat4(PacketUniform::Model, &Mat4::IDENTITY);
    packet.set_f32(PacketUniform::Scale, 2.0);

    assert_eq!(packet.data(PacketUniform::Model).map(|b| b.len()), Some(64));
    assert_eq!(packet.data(PacketUniform::Scale), Some(2.0f32.to_ne_bytes().as_slice()));
    assert!(packet.data(PacketUniform::Color).is_none());
}

#[test]
fn test_reset_clears_values_but_keeps_allocations() {
    let mut packet = Packet::default();
    packet.textures.extend([1, 2, 3]);
    packet.set_vec4(PacketUniform::Color, Vec4::ONE);
    packet.instance = Some(InstanceRef { id: 2, count: 10 });

    packet.reset();
    assert!(packet.textures.is_empty());
    assert!(packet.textures.capacity() >= 3);
    assert!(packet.data(PacketUniform::Color).is_none());
    assert!(!packet.is_instanced());
}

#[test]
fn test_packets_reuse_pool() {
    let mut packets = Packets::new();
    packets.next().mesh = 1;
    packets.next().mesh = 2;
    assert_eq!(packets.len(), 2);

    packets.reset();
    assert!(packets.is_empty());
    assert_eq!(packets.pooled(), 2);

    let p = packets.next();
    assert_eq!(p.mesh, 0, "reused packet must come back reset");
    assert_eq!(packets.pooled(), 2);
}

#[test]
fn test_packets_iterate_in_append_order() {
    let mut packets = Packets::new();
    for mesh in [5, 3, 9] {
        packets.next().mesh = mesh;
    }
    let order: Vec<u32> = packets.iter().map(|p| p.mesh).collect();
    assert_eq!(order, vec![5, 3, 9]);
}
